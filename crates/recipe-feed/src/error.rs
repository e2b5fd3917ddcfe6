//! Error taxonomy for page fetches and credential renewal.

use std::time::Duration;

use thiserror::Error;

/// Crate-level result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by session-level operations (configuration, login).
///
/// List loading never returns these: its outcomes are published through
/// [`ListViewState`](crate::paging::ListViewState) and
/// [`ListEvent`](crate::paging::ListEvent).
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// The auth endpoint refused the username/password pair.
    #[error("Login rejected ({status})")]
    LoginRejected { status: u16 },

    #[error("Login failed: {0}")]
    Login(String),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

/// Failure of a single page request.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The server answered 401: the access credential is no longer accepted.
    #[error("Unauthorized")]
    Unauthorized,

    /// Any other non-2xx answer.
    #[error("Unexpected status: {status}")]
    Status { status: u16 },

    /// The request never produced a response.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body was not a page of items.
    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// No credential is held, so no authenticated request can be issued.
    #[error("No credential available - login required")]
    MissingCredential,
}

impl FetchError {
    /// Whether this failure should trigger a credential renewal.
    #[inline]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16) -> Self {
        if status == 401 {
            Self::Unauthorized
        } else {
            Self::Status { status }
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Failure of a credential renewal.
///
/// Cloneable so that every caller coalesced onto one in-flight renewal
/// receives the same value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenewalError {
    /// The store holds no refresh token.
    #[error("Missing refresh token - re-login required")]
    MissingRefreshToken,

    /// The auth endpoint refused the refresh token.
    #[error("Refresh token rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed renewal response: {0}")]
    Decode(String),

    #[error("Renewal timed out after {0:?}")]
    Timeout(Duration),
}

impl RenewalError {
    /// Whether the refresh credential itself is unusable.
    pub fn requires_relogin(&self) -> bool {
        matches!(self, Self::MissingRefreshToken | Self::Rejected { .. })
    }

    /// Whether the failure came from the network rather than the auth server's verdict.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout(_))
    }
}

impl From<reqwest::Error> for RenewalError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(401, true)]
    #[case(403, false)]
    #[case(404, false)]
    #[case(500, false)]
    #[case(503, false)]
    fn test_status_classification(#[case] status: u16, #[case] unauthorized: bool) {
        assert_eq!(FetchError::from_status(status).is_unauthorized(), unauthorized);
    }

    #[test]
    fn test_renewal_error_relogin() {
        assert!(RenewalError::MissingRefreshToken.requires_relogin());
        assert!(
            RenewalError::Rejected {
                status: 401,
                message: "expired".to_string()
            }
            .requires_relogin()
        );
        assert!(!RenewalError::Network("reset".to_string()).requires_relogin());
        assert!(RenewalError::Timeout(Duration::from_secs(1)).is_transient());
    }
}
