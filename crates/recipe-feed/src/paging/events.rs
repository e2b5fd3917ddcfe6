//! One-shot list events.

use serde::Serialize;

/// Notifications a screen reacts to once, as opposed to state it renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ListEvent {
    /// Renewal failed while loading this list; the user must log in again.
    NavigateToLogin { list: String },
    /// A request failed terminally; show the failure once.
    LoadFailed { list: String, reason: String },
}

impl ListEvent {
    #[inline]
    pub fn is_navigate_to_login(&self) -> bool {
        matches!(self, Self::NavigateToLogin { .. })
    }
}
