//! Auth endpoint abstraction.
//!
//! The concrete HTTP implementation lives in [`crate::http::HttpTokenEndpoint`].

use async_trait::async_trait;

use super::types::TokenGrant;
use crate::error::RenewalError;

#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    /// Exchange a refresh token for a new access token.
    ///
    /// # Returns
    /// * `Ok(TokenGrant)` - Renewal accepted; the refresh token may be rotated
    /// * `Err(RenewalError::Rejected)` - The refresh token is invalid or expired
    /// * `Err(...)` - The endpoint could not be reached or answered garbage
    async fn renew_access_token(&self, refresh_token: &str) -> Result<TokenGrant, RenewalError>;
}
