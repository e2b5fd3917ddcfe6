//! Paginated list loading with transparent credential renewal.
//!
//! Each screen supplies a [`PageSource`] for its endpoint and item type; the
//! generic [`PagedFetcher`] handles cursor bookkeeping, the loading guard,
//! end-of-list inference, 401 renewal with a single retry, and reset.

mod events;
mod fetcher;
mod request;
mod source;
mod state;

pub use events::ListEvent;
pub use fetcher::{LoadOutcome, PagedFetcher};
pub use request::{Page, PageCursor, PageRequest};
pub use source::PageSource;
pub use state::ListViewState;
