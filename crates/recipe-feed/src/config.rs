//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api/";

/// Default number of items requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Default sort order for list endpoints.
pub const DEFAULT_SORT: &str = "createdAt,desc";

pub const DEFAULT_USER_AGENT: &str = concat!("recipe-feed/", env!("CARGO_PKG_VERSION"));

/// Configuration supplied by the host application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// API root; list and auth paths are resolved against it.
    pub base_url: String,
    /// Items per page. A page shorter than this ends the list.
    pub page_size: u32,
    /// Sort key sent with every list request until a reset changes it.
    pub default_sort: String,
    /// Upper bound for a single page request.
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,
    /// Upper bound for a credential renewal request.
    #[serde(with = "duration_secs")]
    pub renewal_timeout: Duration,
    #[serde(with = "duration_secs")]
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            default_sort: DEFAULT_SORT.to_string(),
            request_timeout: Duration::from_secs(15),
            renewal_timeout: Duration::from_secs(15),
            connect_timeout: Duration::from_secs(10),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ClientConfig {
    /// Create a ClientConfig from environment variables.
    ///
    /// Environment variables:
    /// - `RECIPE_API_BASE_URL`: API root (default: `http://localhost:8080/api/`)
    /// - `RECIPE_PAGE_SIZE`: items per page (default: 10)
    /// - `RECIPE_DEFAULT_SORT`: sort key (default: `createdAt,desc`)
    /// - `RECIPE_REQUEST_TIMEOUT_SECS`: page request timeout (default: 15)
    /// - `RECIPE_RENEWAL_TIMEOUT_SECS`: renewal request timeout (default: 15)
    ///
    /// Absent or unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`ClientConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let base_url = lookup("RECIPE_API_BASE_URL")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.base_url);

        let page_size = lookup("RECIPE_PAGE_SIZE")
            .and_then(|s| s.trim().parse().ok())
            .filter(|size| *size > 0)
            .unwrap_or(defaults.page_size);

        let default_sort = lookup("RECIPE_DEFAULT_SORT")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.default_sort);

        let request_timeout = lookup("RECIPE_REQUEST_TIMEOUT_SECS")
            .and_then(|s| s.trim().parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        let renewal_timeout = lookup("RECIPE_RENEWAL_TIMEOUT_SECS")
            .and_then(|s| s.trim().parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.renewal_timeout);

        Self {
            base_url,
            page_size,
            default_sort,
            request_timeout,
            renewal_timeout,
            ..defaults
        }
    }

    /// Check the values that would otherwise fail later at request time.
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::config("page_size must be greater than zero"));
        }
        self.base_url()?;
        Ok(())
    }

    /// Parsed API root, always ending with `/` so relative paths join beneath it.
    pub fn base_url(&self) -> Result<Url> {
        let mut raw = self.base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let url = Url::parse(&raw)?;
        if url.cannot_be_a_base() {
            return Err(Error::config(format!("base_url cannot be a base: {raw}")));
        }
        Ok(url)
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
