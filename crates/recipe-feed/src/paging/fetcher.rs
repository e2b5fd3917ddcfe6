//! Paged list fetcher.
//!
//! Drives one logical list through successive page requests:
//!
//! ```text
//! IDLE --load_more--> LOADING --ok--> IDLE (or TERMINAL on a short page)
//!                     LOADING --401--> RENEWING --renewed--> LOADING (one retry)
//!                                      RENEWING --failed---> IDLE + NavigateToLogin
//!                     LOADING --other failure--> IDLE (load_failed)
//! ```
//!
//! At most one request is in flight per list. The guard is checked and set
//! under a lock that is never held across an `.await`, so a call made from a
//! UI callback while another load is pending sees `is_loading` and returns.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::events::ListEvent;
use super::request::{Page, PageCursor, PageRequest};
use super::source::PageSource;
use super::state::ListViewState;
use crate::credentials::{Credential, CredentialRenewer};
use crate::error::{FetchError, RenewalError};

/// Default channel capacity for list events.
const DEFAULT_CHANNEL_CAPACITY: usize = 16;

/// What a `load_more` call ended up doing. Diagnostic only: the same
/// information is already visible through the state and event channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Guard refused the call (already loading, or the list is exhausted).
    Skipped,
    /// A page was appended.
    Loaded { received: usize, last_page: bool },
    /// The request failed; `load_failed` is set.
    Failed,
    /// Renewal failed; `NavigateToLogin` was emitted.
    SessionExpired,
    /// No credential was held, so nothing was requested; `NavigateToLogin` was emitted.
    NotSignedIn,
    /// A reset happened while the request was in flight; its response was dropped.
    Discarded,
}

/// Clears `is_loading` if the `load_more` future is dropped mid-request.
struct PendingRequest<'a, T: Send + Sync + 'static> {
    fetcher: &'a PagedFetcher<T>,
    generation: u64,
    armed: bool,
}

impl<T: Send + Sync + 'static> Drop for PendingRequest<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            self.fetcher.abandon(self.generation);
        }
    }
}

/// Mutable pagination bookkeeping, owned exclusively by the fetcher.
struct Control {
    cursor: PageCursor,
    sort_key: String,
    generation: u64,
    in_flight: Option<CancellationToken>,
}

/// A dispatched request and the generation it belongs to.
struct Ticket {
    generation: u64,
    request: PageRequest,
    cancel: CancellationToken,
}

enum Resolution<T> {
    Loaded(Page<T>),
    Failed(FetchError),
    SessionExpired(RenewalError),
    NotSignedIn,
}

/// Fetches pages of one list and publishes its [`ListViewState`].
pub struct PagedFetcher<T> {
    source: Arc<dyn PageSource<T>>,
    renewer: CredentialRenewer,
    page_size: u32,
    request_timeout: Duration,
    control: Mutex<Control>,
    state: watch::Sender<ListViewState<T>>,
    events: broadcast::Sender<ListEvent>,
}

impl<T> PagedFetcher<T>
where
    T: Send + Sync + 'static,
{
    pub fn new(
        source: Arc<dyn PageSource<T>>,
        renewer: CredentialRenewer,
        page_size: u32,
        sort_key: impl Into<String>,
        request_timeout: Duration,
    ) -> Self {
        let (state, _) = watch::channel(ListViewState::new());
        let (events, _) = broadcast::channel(DEFAULT_CHANNEL_CAPACITY);
        Self {
            source,
            renewer,
            page_size: page_size.max(1),
            request_timeout,
            control: Mutex::new(Control {
                cursor: PageCursor::INITIAL,
                sort_key: sort_key.into(),
                generation: 0,
                in_flight: None,
            }),
            state,
            events,
        }
    }

    /// List name used in logs and events.
    pub fn name(&self) -> &str {
        self.source.name()
    }

    /// Subscribe to state updates.
    pub fn subscribe(&self) -> watch::Receiver<ListViewState<T>> {
        self.state.subscribe()
    }

    /// Subscribe to one-shot events.
    pub fn events(&self) -> broadcast::Receiver<ListEvent> {
        self.events.subscribe()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> ListViewState<T>
    where
        T: Clone,
    {
        self.state.borrow().clone()
    }

    /// Page index the next request will ask for.
    pub fn cursor(&self) -> PageCursor {
        self.control.lock().cursor
    }

    pub fn sort_key(&self) -> String {
        self.control.lock().sort_key.clone()
    }

    /// Number of resets so far.
    pub fn generation(&self) -> u64 {
        self.control.lock().generation
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Request the next page.
    ///
    /// No-op while a request is in flight or after the last page arrived.
    pub async fn load_more(&self) -> LoadOutcome {
        match self.begin(false) {
            Some(ticket) => self.run(ticket).await,
            None => LoadOutcome::Skipped,
        }
    }

    /// Re-request the page that failed. No-op unless `load_failed` is set.
    pub async fn retry(&self) -> LoadOutcome {
        match self.begin(true) {
            Some(ticket) => self.run(ticket).await,
            None => LoadOutcome::Skipped,
        }
    }

    /// Clear `load_failed` once the failure has been shown.
    pub fn acknowledge_failure(&self) {
        let _control = self.control.lock();
        self.state.send_if_modified(|state| {
            let was_failed = state.load_failed;
            state.load_failed = false;
            was_failed
        });
    }

    /// Start the list over, optionally with a new sort key.
    ///
    /// An in-flight request is cancelled and its response, if it still
    /// arrives, is discarded.
    pub fn reset(&self, new_sort_key: Option<String>) {
        let mut control = self.control.lock();
        control.generation += 1;
        if let Some(cancel) = control.in_flight.take() {
            cancel.cancel();
        }
        control.cursor = PageCursor::INITIAL;
        if let Some(sort_key) = new_sort_key {
            control.sort_key = sort_key;
        }
        debug!(
            list = %self.name(),
            generation = control.generation,
            sort = %control.sort_key,
            "List reset"
        );
        self.state.send_replace(ListViewState::new());
    }

    /// Check the guard and mark the list loading, atomically.
    fn begin(&self, retry: bool) -> Option<Ticket> {
        let mut control = self.control.lock();
        {
            let state = self.state.borrow();
            if !state.can_load_more() {
                debug!(
                    list = %self.name(),
                    is_loading = state.is_loading,
                    is_last_page = state.is_last_page,
                    "Load skipped"
                );
                return None;
            }
            if retry && !state.load_failed {
                return None;
            }
        }

        let cancel = CancellationToken::new();
        control.in_flight = Some(cancel.clone());
        let request = PageRequest {
            cursor: control.cursor,
            page_size: self.page_size,
            sort_key: control.sort_key.clone(),
        };
        self.state.send_modify(|state| {
            state.is_loading = true;
            state.load_failed = false;
        });

        Some(Ticket {
            generation: control.generation,
            request,
            cancel,
        })
    }

    async fn run(&self, ticket: Ticket) -> LoadOutcome {
        let mut pending = PendingRequest {
            fetcher: self,
            generation: ticket.generation,
            armed: true,
        };
        let resolution = tokio::select! {
            biased;
            _ = ticket.cancel.cancelled() => None,
            resolution = self.fetch_with_renewal(&ticket.request) => Some(resolution),
        };
        pending.armed = false;

        match resolution {
            Some(resolution) => self.resolve(ticket, resolution),
            None => {
                debug!(
                    list = %self.name(),
                    page = %ticket.request.cursor,
                    "Request cancelled by reset"
                );
                LoadOutcome::Discarded
            }
        }
    }

    #[instrument(skip(self), fields(list = %self.name(), page = %request.cursor))]
    async fn fetch_with_renewal(&self, request: &PageRequest) -> Resolution<T> {
        let Some((epoch, credential)) = self.renewer.store().snapshot() else {
            return Resolution::NotSignedIn;
        };

        match self.fetch_once(request, &credential).await {
            Ok(page) => Resolution::Loaded(page),
            Err(e) if e.is_unauthorized() => {
                info!("Access credential refused; renewing");
                match self.renewer.renew_after(epoch).await {
                    // The retry's outcome is final, even another 401.
                    Ok(fresh) => match self.fetch_once(request, &fresh).await {
                        Ok(page) => Resolution::Loaded(page),
                        Err(e) => Resolution::Failed(e),
                    },
                    Err(e) => Resolution::SessionExpired(e),
                }
            }
            Err(e) => Resolution::Failed(e),
        }
    }

    async fn fetch_once(
        &self,
        request: &PageRequest,
        credential: &Credential,
    ) -> Result<Page<T>, FetchError> {
        tokio::time::timeout(
            self.request_timeout,
            self.source.fetch_page(request, credential),
        )
        .await
        .map_err(|_| FetchError::Timeout(self.request_timeout))?
    }

    /// Release the guard of a request whose caller went away before it resolved.
    fn abandon(&self, generation: u64) {
        let mut control = self.control.lock();
        if control.generation != generation {
            return;
        }
        control.in_flight = None;
        debug!(
            list = %self.name(),
            page = %control.cursor,
            "Request dropped before completion"
        );
        self.state.send_modify(|state| {
            state.is_loading = false;
        });
    }

    /// Apply a finished request, unless a reset made it stale.
    fn resolve(&self, ticket: Ticket, resolution: Resolution<T>) -> LoadOutcome {
        let mut control = self.control.lock();
        if control.generation != ticket.generation {
            debug!(
                list = %self.name(),
                stale_generation = ticket.generation,
                generation = control.generation,
                "Discarding response from before reset"
            );
            return LoadOutcome::Discarded;
        }
        control.in_flight = None;

        match resolution {
            Resolution::Loaded(page) => {
                let received = page.len();
                let last_page = page.is_last(self.page_size);
                control.cursor = control.cursor.next();
                self.state.send_modify(|state| {
                    state.items.extend(page.items);
                    state.is_last_page = last_page;
                    state.is_loading = false;
                    state.load_failed = false;
                });

                if last_page {
                    info!(
                        list = %self.name(),
                        page = %ticket.request.cursor,
                        received,
                        "Reached end of list"
                    );
                } else {
                    debug!(list = %self.name(), page = %ticket.request.cursor, received, "Page loaded");
                }
                LoadOutcome::Loaded {
                    received,
                    last_page,
                }
            }
            Resolution::Failed(e) => {
                warn!(
                    list = %self.name(),
                    page = %ticket.request.cursor,
                    error = %e,
                    "Page request failed"
                );
                self.state.send_modify(|state| {
                    state.is_loading = false;
                    state.load_failed = true;
                });
                let _ = self.events.send(ListEvent::LoadFailed {
                    list: self.name().to_string(),
                    reason: e.to_string(),
                });
                LoadOutcome::Failed
            }
            Resolution::SessionExpired(e) => {
                warn!(
                    list = %self.name(),
                    error = %e,
                    "Session expired while loading; navigating to login"
                );
                self.state.send_modify(|state| {
                    state.is_loading = false;
                });
                let _ = self.events.send(ListEvent::NavigateToLogin {
                    list: self.name().to_string(),
                });
                LoadOutcome::SessionExpired
            }
            Resolution::NotSignedIn => {
                warn!(
                    list = %self.name(),
                    error = %FetchError::MissingCredential,
                    "No credential held; navigating to login"
                );
                self.state.send_modify(|state| {
                    state.is_loading = false;
                });
                let _ = self.events.send(ListEvent::NavigateToLogin {
                    list: self.name().to_string(),
                });
                LoadOutcome::NotSignedIn
            }
        }
    }
}
