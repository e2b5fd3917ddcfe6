//! Core credential types.

use std::fmt;

use chrono::{DateTime, Utc};
use reqwest::RequestBuilder;
use serde::{Deserialize, Serialize};

/// Access/refresh credential pair for one signed-in user.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: String,
}

impl Credential {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }

    /// Check if the access token can be sent at all.
    #[inline]
    pub fn has_access_token(&self) -> bool {
        !self.access_token.trim().is_empty()
    }

    #[inline]
    pub fn has_refresh_token(&self) -> bool {
        !self.refresh_token.trim().is_empty()
    }

    /// Attach the `Authorization` header to a request.
    pub fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(&self.access_token)
    }

    /// Apply a renewal grant. The refresh token is kept when the server does not rotate it.
    pub fn renewed(&self, grant: TokenGrant) -> Self {
        Self {
            access_token: grant.access_token,
            refresh_token: grant
                .refresh_token
                .filter(|token| !token.trim().is_empty())
                .unwrap_or_else(|| self.refresh_token.clone()),
        }
    }
}

impl From<TokenGrant> for Credential {
    fn from(grant: TokenGrant) -> Self {
        Self {
            access_token: grant.access_token,
            refresh_token: grant.refresh_token.unwrap_or_default(),
        }
    }
}

// Tokens never reach logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .finish()
    }
}

fn redact(token: &str) -> &'static str {
    if token.is_empty() { "<empty>" } else { "<redacted>" }
}

/// Token body returned by the auth endpoint for both login and renewal.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &redact(&self.access_token))
            .field("rotated_refresh_token", &self.refresh_token.is_some())
            .finish()
    }
}

/// Session lifecycle events, published once per occurrence regardless of how
/// many lists were waiting on the outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A credential was installed by login or restore.
    Started { timestamp: DateTime<Utc> },
    /// The access credential was renewed.
    Renewed { timestamp: DateTime<Utc> },
    /// Renewal failed; the credential has been cleared.
    RenewalFailed {
        error: String,
        /// Whether the refresh token itself was refused (as opposed to a network failure).
        requires_relogin: bool,
        timestamp: DateTime<Utc>,
    },
    /// The host ended the session.
    LoggedOut { timestamp: DateTime<Utc> },
}

impl SessionEvent {
    /// Event name for log correlation.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Started { .. } => "session_started",
            Self::Renewed { .. } => "credential_renewed",
            Self::RenewalFailed { .. } => "credential_renewal_failed",
            Self::LoggedOut { .. } => "session_logged_out",
        }
    }

    /// Whether the host must send the user back to the login screen.
    pub fn ends_session(&self) -> bool {
        matches!(self, Self::RenewalFailed { .. } | Self::LoggedOut { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renewed_keeps_refresh_token_when_not_rotated() {
        let credential = Credential::new("old-access", "refresh-1");
        let renewed = credential.renewed(TokenGrant {
            access_token: "new-access".to_string(),
            refresh_token: None,
        });
        assert_eq!(renewed, Credential::new("new-access", "refresh-1"));

        let rotated = credential.renewed(TokenGrant {
            access_token: "new-access".to_string(),
            refresh_token: Some("refresh-2".to_string()),
        });
        assert_eq!(rotated.refresh_token, "refresh-2");
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let credential = Credential::new("secret-access", "secret-refresh");
        let rendered = format!("{credential:?}");
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_token_grant_wire_format() {
        let grant: TokenGrant =
            serde_json::from_str(r#"{"accessToken":"a","refreshToken":"r"}"#).unwrap();
        assert_eq!(grant.access_token, "a");
        assert_eq!(grant.refresh_token.as_deref(), Some("r"));

        let without_refresh: TokenGrant = serde_json::from_str(r#"{"accessToken":"a"}"#).unwrap();
        assert!(without_refresh.refresh_token.is_none());
    }

    #[test]
    fn test_session_event_names() {
        let event = SessionEvent::RenewalFailed {
            error: "rejected".to_string(),
            requires_relogin: true,
            timestamp: Utc::now(),
        };
        assert_eq!(event.event_name(), "credential_renewal_failed");
        assert!(event.ends_session());
        assert!(
            !SessionEvent::Renewed {
                timestamp: Utc::now()
            }
            .ends_session()
        );
    }
}
