//! In-memory holder for the current credential.
//!
//! Every replacement swaps the whole `Arc<Credential>` and bumps an epoch
//! counter, so readers never see a half-updated pair and can tell whether the
//! credential they used has since been replaced.

use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::RequestBuilder;

use super::types::Credential;
use crate::error::FetchError;

#[derive(Debug, Default)]
struct Slot {
    credential: Option<Arc<Credential>>,
    epoch: u64,
}

/// Holds the credential for one signed-in user.
///
/// Created by the host at startup or login and shared by `Arc` with every
/// component that needs it. Mutation goes through
/// [`CredentialRenewer`](super::CredentialRenewer).
#[derive(Debug, Default)]
pub struct CredentialStore {
    slot: RwLock<Slot>,
}

impl CredentialStore {
    /// Create an empty store (signed out).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding a previously persisted credential.
    pub fn with_credential(credential: Credential) -> Self {
        Self {
            slot: RwLock::new(Slot {
                credential: Some(Arc::new(credential)),
                epoch: 1,
            }),
        }
    }

    /// Current credential, if signed in.
    pub fn current(&self) -> Option<Arc<Credential>> {
        self.slot.read().credential.clone()
    }

    /// Current credential together with the epoch it was installed at.
    pub fn snapshot(&self) -> Option<(u64, Arc<Credential>)> {
        let slot = self.slot.read();
        slot.credential
            .as_ref()
            .map(|credential| (slot.epoch, Arc::clone(credential)))
    }

    /// Monotonic replacement counter.
    pub fn epoch(&self) -> u64 {
        self.slot.read().epoch
    }

    /// Check if an access token is held.
    pub fn has_valid_access_token(&self) -> bool {
        self.slot
            .read()
            .credential
            .as_ref()
            .is_some_and(|credential| credential.has_access_token())
    }

    /// Attach the current `Authorization` header to a request.
    pub fn attach_auth_header(&self, request: RequestBuilder) -> Result<RequestBuilder, FetchError> {
        match self.current() {
            Some(credential) if credential.has_access_token() => Ok(credential.authorize(request)),
            _ => Err(FetchError::MissingCredential),
        }
    }

    /// Replace the credential; returns the new epoch.
    pub(crate) fn replace(&self, credential: Credential) -> (u64, Arc<Credential>) {
        let credential = Arc::new(credential);
        let mut slot = self.slot.write();
        slot.credential = Some(Arc::clone(&credential));
        slot.epoch += 1;
        (slot.epoch, credential)
    }

    /// Drop the credential; returns the new epoch.
    pub(crate) fn clear(&self) -> u64 {
        let mut slot = self.slot.write();
        slot.credential = None;
        slot.epoch += 1;
        slot.epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_store() {
        let store = CredentialStore::new();
        assert!(store.current().is_none());
        assert!(store.snapshot().is_none());
        assert!(!store.has_valid_access_token());
        assert_eq!(store.epoch(), 0);
    }

    #[test]
    fn test_replace_and_clear_advance_epoch() {
        let store = CredentialStore::with_credential(Credential::new("a1", "r1"));
        let (epoch, _) = store.snapshot().unwrap();
        assert_eq!(epoch, 1);

        let (epoch, credential) = store.replace(Credential::new("a2", "r1"));
        assert_eq!(epoch, 2);
        assert_eq!(credential.access_token, "a2");
        assert_eq!(store.current().unwrap().access_token, "a2");

        assert_eq!(store.clear(), 3);
        assert!(store.current().is_none());
    }

    #[test]
    fn test_readers_keep_their_snapshot() {
        let store = CredentialStore::with_credential(Credential::new("a1", "r1"));
        let held = store.current().unwrap();
        store.replace(Credential::new("a2", "r2"));
        assert_eq!(held.access_token, "a1");
    }

    #[test]
    fn test_blank_access_token_is_not_valid() {
        let store = CredentialStore::with_credential(Credential::new("  ", "r1"));
        assert!(!store.has_valid_access_token());
    }

    #[test]
    fn test_attach_auth_header() {
        let client =
            crate::http::build_client(&crate::config::ClientConfig::default()).unwrap();

        let store = CredentialStore::with_credential(Credential::new("token-1", "r1"));
        let request = store
            .attach_auth_header(client.get("http://localhost/recipes"))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            request.headers()[reqwest::header::AUTHORIZATION],
            "Bearer token-1"
        );

        let empty = CredentialStore::new();
        assert!(matches!(
            empty.attach_auth_header(client.get("http://localhost/recipes")),
            Err(FetchError::MissingCredential)
        ));
    }
}
