//! Credential management.
//!
//! # Architecture
//!
//! - [`Credential`]: access/refresh token pair
//! - [`CredentialStore`]: holds the current credential, injected wherever it is needed
//! - [`TokenEndpoint`]: exchanges a refresh token for a new access token
//! - [`CredentialRenewer`]: single-flight renewal, the only writer of the store

mod endpoint;
mod renewer;
mod store;
mod types;

pub use endpoint::TokenEndpoint;
pub use renewer::CredentialRenewer;
pub use store::CredentialStore;
pub use types::{Credential, SessionEvent, TokenGrant};
