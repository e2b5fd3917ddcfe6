//! Token endpoint over HTTP.
//!
//! - `POST {base}auth/refresh` with `{"refreshToken": ...}`
//! - `POST {base}auth/login` with `{"username": ..., "password": ...}`
//!
//! Both answer `{"accessToken": ..., "refreshToken": ...?}`.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::{debug, instrument};
use url::Url;

use crate::credentials::{TokenEndpoint, TokenGrant};
use crate::error::{Error, RenewalError, Result};

const REFRESH_PATH: &str = "auth/refresh";
const LOGIN_PATH: &str = "auth/login";

/// Longest slice of an error body kept in a [`RenewalError::Rejected`] message.
const MAX_ERROR_BODY: usize = 200;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Auth endpoint client.
pub struct HttpTokenEndpoint {
    client: Client,
    refresh_url: Url,
    login_url: Url,
}

impl HttpTokenEndpoint {
    pub fn new(client: Client, base_url: &Url) -> Result<Self> {
        Ok(Self {
            client,
            refresh_url: base_url.join(REFRESH_PATH)?,
            login_url: base_url.join(LOGIN_PATH)?,
        })
    }

    /// Exchange a username/password pair for a credential.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenGrant> {
        let response = self
            .client
            .post(self.login_url.clone())
            .json(&LoginRequest { username, password })
            .send()
            .await?;

        let status = response.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(Error::LoginRejected {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(Error::Login(format!("unexpected status {status}")));
        }

        let grant: TokenGrant = response
            .json()
            .await
            .map_err(|e| Error::Login(format!("malformed token response: {e}")))?;
        debug!("Login accepted");
        Ok(grant)
    }
}

/// Map a failed refresh answer to a renewal error.
fn renewal_failure(status: StatusCode, body: &str) -> RenewalError {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            let mut message: String = body.trim().chars().take(MAX_ERROR_BODY).collect();
            if message.is_empty() {
                message = status
                    .canonical_reason()
                    .unwrap_or("refresh token refused")
                    .to_string();
            }
            RenewalError::Rejected {
                status: status.as_u16(),
                message,
            }
        }
        _ => RenewalError::Network(format!("unexpected status {status}")),
    }
}

#[async_trait]
impl TokenEndpoint for HttpTokenEndpoint {
    async fn renew_access_token(
        &self,
        refresh_token: &str,
    ) -> std::result::Result<TokenGrant, RenewalError> {
        let response = self
            .client
            .post(self.refresh_url.clone())
            .json(&RefreshRequest { refresh_token })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(renewal_failure(status, &body));
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| RenewalError::Decode(e.to_string()))
    }
}
