//! reqwest-backed implementations of the list transport and auth endpoint.

mod auth;
mod lists;

pub use auth::HttpTokenEndpoint;
pub use lists::{HttpListSource, decode_page};

use std::sync::OnceLock;

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::Result;

/// reqwest is built without a bundled crypto provider; install aws-lc-rs once.
pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Build the shared HTTP client.
///
/// Per-request timeouts are applied by the fetcher and renewer, so only the
/// connect timeout is set here.
pub fn build_client(config: &ClientConfig) -> Result<reqwest::Client> {
    install_rustls_provider();

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    let mut builder = reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .default_headers(headers);

    if !config.connect_timeout.is_zero() {
        builder = builder.connect_timeout(config.connect_timeout);
    }

    let client = builder.build()?;
    debug!(base_url = %config.base_url, "HTTP client created");
    Ok(client)
}
