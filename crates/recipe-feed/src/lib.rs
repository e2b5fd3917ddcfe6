//! Authenticated paginated data access for the recipe client.
//!
//! Screens subscribe to a [`PagedFetcher`]'s [`ListViewState`] and call
//! [`PagedFetcher::load_more`] as the user scrolls. An expired access token is
//! renewed once per failure through the shared [`CredentialRenewer`] and the
//! page is retried; if renewal fails the list emits
//! [`ListEvent::NavigateToLogin`].
//!
//! ```no_run
//! use recipe_feed::{ClientConfig, Credential, RecipeList, RecipeSession};
//!
//! # async fn run() -> recipe_feed::Result<()> {
//! let session = RecipeSession::new(ClientConfig::from_env())?;
//! session.restore(Credential::new("access", "refresh"));
//!
//! let feed = session.fetcher(&RecipeList::HomeFeed)?;
//! let mut state = feed.subscribe();
//! feed.load_more().await;
//! println!("{} recipes", state.borrow_and_update().items.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod credentials;
pub mod error;
pub mod http;
pub mod paging;
pub mod recipe;
pub mod session;

pub use config::ClientConfig;
pub use credentials::{Credential, CredentialRenewer, CredentialStore, SessionEvent, TokenEndpoint};
pub use error::{Error, FetchError, RenewalError, Result};
pub use paging::{ListEvent, ListViewState, LoadOutcome, PageSource, PagedFetcher};
pub use recipe::{RecipeList, RecipeSummary};
pub use session::RecipeSession;
