//! Transport contract for list endpoints.

use async_trait::async_trait;

use super::request::{Page, PageRequest};
use crate::credentials::Credential;
use crate::error::FetchError;

/// Fetches one page of a list.
///
/// Implementations map an HTTP 401 to [`FetchError::Unauthorized`] and any
/// other non-2xx status to [`FetchError::Status`]; the fetcher relies on that
/// split to decide between renewal and a plain failure.
#[async_trait]
pub trait PageSource<T>: Send + Sync {
    /// Short name used in logs (e.g. "home_feed").
    fn name(&self) -> &str;

    async fn fetch_page(
        &self,
        request: &PageRequest,
        credential: &Credential,
    ) -> Result<Page<T>, FetchError>;
}
