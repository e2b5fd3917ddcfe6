//! Single-flight credential renewal.
//!
//! Several lists can hit a 401 at nearly the same moment. Only one refresh
//! call reaches the auth endpoint: callers arriving while it runs join the
//! same in-flight renewal, and callers whose 401 was produced by a credential
//! that has already been replaced get the current credential back directly.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, warn};

use super::endpoint::TokenEndpoint;
use super::store::CredentialStore;
use super::types::{Credential, SessionEvent};
use crate::error::RenewalError;

type RenewalResult = Result<Arc<Credential>, RenewalError>;
type SharedRenewal = Shared<BoxFuture<'static, RenewalResult>>;

/// Default channel capacity for session events.
const DEFAULT_CHANNEL_CAPACITY: usize = 64;

struct InFlight {
    id: u64,
    renewal: SharedRenewal,
}

struct Inner {
    store: Arc<CredentialStore>,
    endpoint: Arc<dyn TokenEndpoint>,
    timeout: Duration,
    in_flight: Mutex<Option<InFlight>>,
    /// Failure of the most recent renewal, keyed by the epoch its clear produced.
    last_failure: Mutex<Option<(u64, RenewalError)>>,
    next_id: AtomicU64,
    endpoint_calls: AtomicU64,
    events: broadcast::Sender<SessionEvent>,
}

/// Renews the access credential held in a [`CredentialStore`].
///
/// Cheap to clone; clones share the same in-flight state.
#[derive(Clone)]
pub struct CredentialRenewer {
    inner: Arc<Inner>,
}

impl CredentialRenewer {
    pub fn new(
        store: Arc<CredentialStore>,
        endpoint: Arc<dyn TokenEndpoint>,
        timeout: Duration,
    ) -> Self {
        let (events, _) = broadcast::channel(DEFAULT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                store,
                endpoint,
                timeout,
                in_flight: Mutex::new(None),
                last_failure: Mutex::new(None),
                next_id: AtomicU64::new(1),
                endpoint_calls: AtomicU64::new(0),
                events,
            }),
        }
    }

    /// The store this renewer writes to.
    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.inner.store
    }

    /// Subscribe to session lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Number of refresh calls issued to the auth endpoint so far.
    pub fn endpoint_calls(&self) -> u64 {
        self.inner.endpoint_calls.load(Ordering::SeqCst)
    }

    /// Install a credential obtained from login or restored from storage.
    pub fn start_session(&self, credential: Credential) -> Arc<Credential> {
        let (epoch, credential) = self.inner.store.replace(credential);
        *self.inner.last_failure.lock() = None;
        info!(epoch, "Session started");
        self.inner.publish(SessionEvent::Started {
            timestamp: Utc::now(),
        });
        credential
    }

    /// Drop the credential at logout.
    pub fn end_session(&self) {
        let epoch = self.inner.store.clear();
        info!(epoch, "Session ended");
        self.inner.publish(SessionEvent::LoggedOut {
            timestamp: Utc::now(),
        });
    }

    /// Renew the access credential, joining a renewal already in flight.
    pub async fn renew(&self) -> RenewalResult {
        self.renew_inner(None).await
    }

    /// Renew after the credential installed at `stale_epoch` was refused.
    ///
    /// If the store has moved past `stale_epoch` since, no refresh is issued:
    /// the current credential is returned, or the failure that cleared it.
    pub async fn renew_after(&self, stale_epoch: u64) -> RenewalResult {
        self.renew_inner(Some(stale_epoch)).await
    }

    #[instrument(skip(self), name = "credential_renewal")]
    async fn renew_inner(&self, stale_epoch: Option<u64>) -> RenewalResult {
        let (id, renewal) = {
            let mut in_flight = self.inner.in_flight.lock();

            if let Some(current) = in_flight.as_ref() {
                debug!(renewal_id = current.id, "Joining in-flight renewal");
                (current.id, current.renewal.clone())
            } else {
                if let Some(stale_epoch) = stale_epoch {
                    if let Some(result) = self.inner.settled_since(stale_epoch) {
                        return result;
                    }
                }

                let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
                let inner = Arc::clone(&self.inner);
                // Spawned so the refresh completes even if every waiter is cancelled.
                let handle = tokio::spawn(async move { inner.perform_renewal(id).await });
                let renewal = async move {
                    handle.await.unwrap_or_else(|e| {
                        Err(RenewalError::Network(format!("renewal task failed: {e}")))
                    })
                }
                .boxed()
                .shared();

                *in_flight = Some(InFlight {
                    id,
                    renewal: renewal.clone(),
                });
                (id, renewal)
            }
        };

        let result = renewal.await;
        self.inner.finish(id);
        result
    }
}

impl Inner {
    fn publish(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Outcome already produced for a credential newer than `stale_epoch`.
    fn settled_since(&self, stale_epoch: u64) -> Option<RenewalResult> {
        if let Some((epoch, credential)) = self.store.snapshot() {
            if epoch > stale_epoch {
                debug!(stale_epoch, epoch, "Credential already replaced; skipping renewal");
                return Some(Ok(credential));
            }
            return None;
        }

        match self.last_failure.lock().as_ref() {
            Some((epoch, error)) if *epoch > stale_epoch => {
                debug!(stale_epoch, epoch, "Credential already cleared by a failed renewal");
                Some(Err(error.clone()))
            }
            _ => None,
        }
    }

    fn finish(&self, id: u64) {
        let mut in_flight = self.in_flight.lock();
        if in_flight.as_ref().is_some_and(|current| current.id == id) {
            *in_flight = None;
        }
    }

    async fn perform_renewal(self: Arc<Self>, id: u64) -> RenewalResult {
        let result = self.call_endpoint().await;
        match result {
            Ok(credential) => {
                let (epoch, credential) = self.store.replace(credential);
                *self.last_failure.lock() = None;
                info!(renewal_id = id, epoch, "Credential renewal successful");
                self.publish(SessionEvent::Renewed {
                    timestamp: Utc::now(),
                });
                self.finish(id);
                Ok(credential)
            }
            Err(e) => {
                let epoch = self.store.clear();
                *self.last_failure.lock() = Some((epoch, e.clone()));
                error!(
                    renewal_id = id,
                    error = %e,
                    requires_relogin = e.requires_relogin(),
                    "Credential renewal failed - session terminated"
                );
                self.publish(SessionEvent::RenewalFailed {
                    error: e.to_string(),
                    requires_relogin: e.requires_relogin(),
                    timestamp: Utc::now(),
                });
                self.finish(id);
                Err(e)
            }
        }
    }

    async fn call_endpoint(&self) -> Result<Credential, RenewalError> {
        let current = match self.store.current() {
            Some(credential) if credential.has_refresh_token() => credential,
            _ => {
                warn!("Missing refresh token - cannot renew");
                return Err(RenewalError::MissingRefreshToken);
            }
        };

        self.endpoint_calls.fetch_add(1, Ordering::SeqCst);
        let grant = tokio::time::timeout(
            self.timeout,
            self.endpoint.renew_access_token(&current.refresh_token),
        )
        .await
        .map_err(|_| RenewalError::Timeout(self.timeout))??;

        Ok(current.renewed(grant))
    }
}
