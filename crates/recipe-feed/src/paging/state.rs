//! Observable list state.

use serde::Serialize;

/// What a screen renders for one list.
///
/// Published through a `watch` channel; each resolution of a request is a
/// single update, so observers never see new items with stale flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListViewState<T> {
    /// Every item received so far, in arrival order.
    pub items: Vec<T>,
    /// A request is dispatched and not yet resolved.
    pub is_loading: bool,
    /// The last page was shorter than the page size.
    pub is_last_page: bool,
    /// The last request failed for a reason other than an expired session.
    pub load_failed: bool,
}

impl<T> ListViewState<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            is_loading: false,
            is_last_page: false,
            load_failed: false,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether `load_more` would dispatch a request right now.
    #[inline]
    pub fn can_load_more(&self) -> bool {
        !self.is_loading && !self.is_last_page
    }
}

impl<T> Default for ListViewState<T> {
    fn default() -> Self {
        Self::new()
    }
}
