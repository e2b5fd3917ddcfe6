//! Session wiring.
//!
//! A [`RecipeSession`] owns one credential store and one renewer and hands
//! out fetchers bound to them. The host creates it at startup and drops it
//! when the app exits; login and logout only swap the credential inside.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;
use url::Url;

use crate::config::ClientConfig;
use crate::credentials::{Credential, CredentialRenewer, CredentialStore, SessionEvent};
use crate::error::Result;
use crate::http::{self, HttpListSource, HttpTokenEndpoint};
use crate::paging::{PageSource, PagedFetcher};
use crate::recipe::{RecipeList, RecipeSummary};

pub struct RecipeSession {
    config: ClientConfig,
    base_url: Url,
    client: reqwest::Client,
    auth: Arc<HttpTokenEndpoint>,
    renewer: CredentialRenewer,
}

impl RecipeSession {
    /// Create a signed-out session.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_store(config, Arc::new(CredentialStore::new()))
    }

    /// Create a session around an existing store (e.g. one restored from disk).
    pub fn with_store(config: ClientConfig, store: Arc<CredentialStore>) -> Result<Self> {
        config.validate()?;
        let base_url = config.base_url()?;
        let client = http::build_client(&config)?;
        let auth = Arc::new(HttpTokenEndpoint::new(client.clone(), &base_url)?);
        let renewer = CredentialRenewer::new(store, auth.clone(), config.renewal_timeout);

        Ok(Self {
            config,
            base_url,
            client,
            auth,
            renewer,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        self.renewer.store()
    }

    pub fn renewer(&self) -> &CredentialRenewer {
        &self.renewer
    }

    pub fn is_signed_in(&self) -> bool {
        self.store().has_valid_access_token()
    }

    /// Subscribe to session lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.renewer.subscribe()
    }

    /// Sign in with a username and password.
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let grant = self.auth.login(username, password).await?;
        self.renewer.start_session(Credential::from(grant));
        info!(%username, "Signed in");
        Ok(())
    }

    /// Install a credential persisted by the host.
    pub fn restore(&self, credential: Credential) {
        self.renewer.start_session(credential);
    }

    pub fn logout(&self) {
        self.renewer.end_session();
    }

    /// Fetcher for one of the recipe lists, using the configured page size and sort.
    pub fn fetcher(&self, list: &RecipeList) -> Result<PagedFetcher<RecipeSummary>> {
        let source = HttpListSource::recipes(self.client.clone(), &self.base_url, list)?;
        Ok(self.fetcher_for(Arc::new(source)))
    }

    /// Fetcher for any other paged endpoint.
    pub fn fetcher_for<T>(&self, source: Arc<dyn PageSource<T>>) -> PagedFetcher<T>
    where
        T: Send + Sync + 'static,
    {
        PagedFetcher::new(
            source,
            self.renewer.clone(),
            self.config.page_size,
            self.config.default_sort.clone(),
            self.config.request_timeout,
        )
    }
}
