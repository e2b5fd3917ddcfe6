//! End-to-end list loading scenarios against scripted collaborators.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use recipe_feed::credentials::TokenGrant;
use recipe_feed::paging::{Page, PageCursor, PageRequest};
use recipe_feed::{
    Credential, CredentialRenewer, CredentialStore, FetchError, ListEvent, ListViewState,
    LoadOutcome, PageSource, PagedFetcher, RenewalError, SessionEvent, TokenEndpoint,
};

const PAGE_SIZE: u32 = 10;

/// Replays scripted answers: `Ok(n)` is a page of `n` items, `Err(status)` an HTTP failure.
struct ScriptedSource {
    name: &'static str,
    script: Mutex<VecDeque<Result<usize, u16>>>,
    requests: Mutex<Vec<(PageRequest, String)>>,
    next_item: AtomicUsize,
    gate: Option<Arc<Notify>>,
}

impl ScriptedSource {
    fn new(name: &'static str, script: Vec<Result<usize, u16>>) -> Self {
        Self {
            name,
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
            next_item: AtomicUsize::new(0),
            gate: None,
        }
    }

    fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    fn requests(&self) -> Vec<(PageRequest, String)> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl PageSource<String> for ScriptedSource {
    fn name(&self) -> &str {
        self.name
    }

    async fn fetch_page(
        &self,
        request: &PageRequest,
        credential: &Credential,
    ) -> Result<Page<String>, FetchError> {
        self.requests
            .lock()
            .push((request.clone(), credential.access_token.clone()));
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let answer = self.script.lock().pop_front().unwrap_or(Ok(0));
        match answer {
            Ok(count) => {
                let start = self.next_item.fetch_add(count, Ordering::SeqCst);
                let items = (start..start + count)
                    .map(|i| format!("{}-{i}", self.name))
                    .collect();
                Ok(Page::new(items))
            }
            Err(status) => Err(FetchError::from_status(status)),
        }
    }
}

struct CountingEndpoint {
    calls: AtomicUsize,
    succeed: bool,
    gate: Option<Arc<Notify>>,
}

impl CountingEndpoint {
    fn new(succeed: bool) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            succeed,
            gate: None,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenEndpoint for CountingEndpoint {
    async fn renew_access_token(&self, refresh_token: &str) -> Result<TokenGrant, RenewalError> {
        assert_eq!(refresh_token, "refresh-token");
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.succeed {
            Ok(TokenGrant {
                access_token: "renewed-token".to_string(),
                refresh_token: None,
            })
        } else {
            Err(RenewalError::Rejected {
                status: 401,
                message: "refresh token expired".to_string(),
            })
        }
    }
}

fn signed_in_renewer(endpoint: Arc<CountingEndpoint>) -> CredentialRenewer {
    let store = Arc::new(CredentialStore::with_credential(Credential::new(
        "expired-token",
        "refresh-token",
    )));
    CredentialRenewer::new(store, endpoint, Duration::from_secs(5))
}

fn fetcher(source: Arc<ScriptedSource>, renewer: CredentialRenewer) -> PagedFetcher<String> {
    PagedFetcher::new(
        source,
        renewer,
        PAGE_SIZE,
        "createdAt,desc",
        Duration::from_secs(5),
    )
}

#[tokio::test]
async fn scenario_a_short_page_ends_the_list() {
    let source = Arc::new(ScriptedSource::new("feed", vec![Ok(10), Ok(10), Ok(7)]));
    let list = fetcher(source.clone(), signed_in_renewer(Arc::new(CountingEndpoint::new(true))));

    for _ in 0..3 {
        list.load_more().await;
    }

    let state = list.state();
    assert_eq!(state.items.len(), 27);
    assert!(state.is_last_page);
    assert!(!state.is_loading);
    let expected: Vec<String> = (0..27).map(|i| format!("feed-{i}")).collect();
    assert_eq!(state.items, expected);

    assert_eq!(list.load_more().await, LoadOutcome::Skipped);
    assert_eq!(source.request_count(), 3);
    assert_eq!(list.state().items.len(), 27);
}

#[tokio::test]
async fn scenario_b_renewal_then_successful_retry() {
    let source = Arc::new(ScriptedSource::new("feed", vec![Err(401), Ok(5)]));
    let endpoint = Arc::new(CountingEndpoint::new(true));
    let list = fetcher(source.clone(), signed_in_renewer(endpoint.clone()));

    list.load_more().await;

    let state = list.state();
    assert_eq!(state.items.len(), 5);
    assert!(!state.is_loading);
    assert!(!state.load_failed);
    assert!(state.is_last_page);
    assert_eq!(endpoint.calls(), 1);

    let requests = source.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].0, requests[1].0);
    assert_eq!(requests[1].1, "renewed-token");
}

#[tokio::test]
async fn scenario_c_renewal_failure_navigates_to_login_once() {
    let source = Arc::new(ScriptedSource::new("feed", vec![Err(401)]));
    let endpoint = Arc::new(CountingEndpoint::new(false));
    let renewer = signed_in_renewer(endpoint.clone());
    let mut session_events = renewer.subscribe();
    let list = fetcher(source.clone(), renewer.clone());
    let mut events = list.events();

    assert_eq!(list.load_more().await, LoadOutcome::SessionExpired);

    let state = list.state();
    assert_eq!(state.items.len(), 0);
    assert!(!state.is_loading);
    assert!(!state.load_failed);

    assert_eq!(
        events.recv().await.unwrap(),
        ListEvent::NavigateToLogin {
            list: "feed".to_string()
        }
    );
    assert!(events.try_recv().is_err());

    assert!(renewer.store().current().is_none());
    assert!(matches!(
        session_events.recv().await.unwrap(),
        SessionEvent::RenewalFailed {
            requires_relogin: true,
            ..
        }
    ));
    assert_eq!(source.request_count(), 1);
}

#[tokio::test]
async fn scenario_d_server_error_keeps_cursor() {
    let source = Arc::new(ScriptedSource::new("feed", vec![Err(500)]));
    let endpoint = Arc::new(CountingEndpoint::new(true));
    let list = fetcher(source, signed_in_renewer(endpoint.clone()));
    let before = list.cursor();

    assert_eq!(list.load_more().await, LoadOutcome::Failed);

    let state = list.state();
    assert!(!state.is_loading);
    assert!(state.load_failed);
    assert_eq!(list.cursor(), before);
    assert_eq!(endpoint.calls(), 0);
}

#[tokio::test]
async fn unauthorized_retry_is_never_repeated() {
    let source = Arc::new(ScriptedSource::new(
        "feed",
        vec![Err(401), Err(401), Err(401), Err(401)],
    ));
    let endpoint = Arc::new(CountingEndpoint::new(true));
    let list = fetcher(source.clone(), signed_in_renewer(endpoint.clone()));

    assert_eq!(list.load_more().await, LoadOutcome::Failed);

    assert_eq!(source.request_count(), 2);
    assert_eq!(endpoint.calls(), 1);
    assert!(list.state().load_failed);
}

#[tokio::test]
async fn concurrent_unauthorized_lists_share_one_renewal() {
    let gate = Arc::new(Notify::new());
    let endpoint = Arc::new(CountingEndpoint {
        gate: Some(gate.clone()),
        ..CountingEndpoint::new(true)
    });
    let renewer = signed_in_renewer(endpoint.clone());

    let names = ["feed", "search", "bookmarks", "profile"];
    let sources: Vec<Arc<ScriptedSource>> = names
        .iter()
        .map(|name| Arc::new(ScriptedSource::new(name, vec![Err(401), Ok(3)])))
        .collect();
    let lists: Vec<Arc<PagedFetcher<String>>> = sources
        .iter()
        .map(|source| Arc::new(fetcher(source.clone(), renewer.clone())))
        .collect();

    let tasks: Vec<_> = lists
        .iter()
        .map(|list| {
            let list = list.clone();
            tokio::spawn(async move { list.load_more().await })
        })
        .collect();

    while endpoint.calls() == 0 {
        tokio::task::yield_now().await;
    }
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    gate.notify_one();

    for task in tasks {
        assert!(matches!(
            task.await.unwrap(),
            LoadOutcome::Loaded { received: 3, .. }
        ));
    }

    assert_eq!(endpoint.calls(), 1);
    for source in &sources {
        let requests = source.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].1, "renewed-token");
    }
}

#[tokio::test]
async fn concurrent_renewal_failure_reaches_every_list() {
    let gate = Arc::new(Notify::new());
    let endpoint = Arc::new(CountingEndpoint {
        gate: Some(gate.clone()),
        ..CountingEndpoint::new(false)
    });
    let renewer = signed_in_renewer(endpoint.clone());

    let lists: Vec<Arc<PagedFetcher<String>>> = ["feed", "search", "bookmarks"]
        .iter()
        .map(|name| {
            let source = Arc::new(ScriptedSource::new(name, vec![Err(401)]));
            Arc::new(fetcher(source, renewer.clone()))
        })
        .collect();
    let mut receivers: Vec<_> = lists.iter().map(|list| list.events()).collect();

    let tasks: Vec<_> = lists
        .iter()
        .map(|list| {
            let list = list.clone();
            tokio::spawn(async move { list.load_more().await })
        })
        .collect();

    while endpoint.calls() == 0 {
        tokio::task::yield_now().await;
    }
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    gate.notify_one();

    for task in tasks {
        assert_eq!(task.await.unwrap(), LoadOutcome::SessionExpired);
    }
    assert_eq!(endpoint.calls(), 1);
    for receiver in &mut receivers {
        assert!(receiver.recv().await.unwrap().is_navigate_to_login());
    }
}

#[tokio::test]
async fn reset_never_mixes_generations() {
    let gate = Arc::new(Notify::new());
    let source = Arc::new(ScriptedSource::new("search", vec![Ok(10), Ok(4)]).gated(gate.clone()));
    let list = Arc::new(fetcher(
        source.clone(),
        signed_in_renewer(Arc::new(CountingEndpoint::new(true))),
    ));
    let mut state_rx = list.subscribe();

    let stale = {
        let list = list.clone();
        tokio::spawn(async move { list.load_more().await })
    };
    while source.request_count() == 0 {
        tokio::task::yield_now().await;
    }

    list.reset(Some("title,asc".to_string()));
    assert_eq!(stale.await.unwrap(), LoadOutcome::Discarded);

    let fresh = {
        let list = list.clone();
        tokio::spawn(async move { list.load_more().await })
    };
    while source.request_count() < 2 {
        tokio::task::yield_now().await;
    }
    gate.notify_one();
    fresh.await.unwrap();

    let state = state_rx.borrow_and_update().clone();
    assert_eq!(state.items.len(), 10);
    assert!(state.items.iter().all(|item| item.starts_with("search-")));
    assert_eq!(list.cursor().index(), 1);

    let requests = source.requests();
    assert_eq!(requests[0].0.cursor, PageCursor::INITIAL);
    assert_eq!(requests[0].0.sort_key, "createdAt,desc");
    assert_eq!(requests[1].0.cursor, PageCursor::INITIAL);
    assert_eq!(requests[1].0.sort_key, "title,asc");
}

/// Waits until the observer has recorded `count` snapshots.
async fn observed(seen: &Mutex<Vec<ListViewState<String>>>, count: usize) {
    while seen.lock().len() < count {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn each_transition_is_one_consistent_notification() {
    let gate = Arc::new(Notify::new());
    let source = Arc::new(
        ScriptedSource::new("feed", vec![Ok(10), Err(503)]).gated(gate.clone()),
    );
    let list = Arc::new(fetcher(
        source.clone(),
        signed_in_renewer(Arc::new(CountingEndpoint::new(true))),
    ));

    let seen = Arc::new(Mutex::new(Vec::new()));
    let observer = {
        let mut rx = list.subscribe();
        let seen = seen.clone();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let snapshot = rx.borrow_and_update().clone();
                seen.lock().push(snapshot);
            }
        })
    };

    for (step, expected_requests) in [1usize, 2].into_iter().enumerate() {
        let task = {
            let list = list.clone();
            tokio::spawn(async move { list.load_more().await })
        };
        observed(&seen, step * 2 + 1).await;
        while source.request_count() < expected_requests {
            tokio::task::yield_now().await;
        }
        gate.notify_one();
        task.await.unwrap();
        observed(&seen, step * 2 + 2).await;
    }
    observer.abort();

    let seen = seen.lock().clone();
    assert_eq!(seen.len(), 4, "one notification per transition: {seen:?}");

    assert!(seen[0].is_loading && seen[0].items.is_empty());
    assert!(!seen[1].is_loading && seen[1].items.len() == 10 && !seen[1].load_failed);
    assert!(seen[2].is_loading && seen[2].items.len() == 10 && !seen[2].load_failed);
    assert!(!seen[3].is_loading && seen[3].items.len() == 10 && seen[3].load_failed);

    for snapshot in &seen {
        assert!(!(snapshot.is_loading && snapshot.load_failed));
    }
}
