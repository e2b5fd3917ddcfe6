use std::path::PathBuf;
use std::sync::Arc;

use recipe_feed::{
    ClientConfig, CredentialStore, ListEvent, LoadOutcome, RecipeList, RecipeSession,
};
use tracing::{debug, info, warn};

use crate::cli::{ListKind, OutputFormat};
use crate::config::{self, AppConfig};
use crate::error::{CliError, Result};
use crate::output::OutputManager;

/// Options of the `list` command.
pub struct ListOptions {
    pub kind: ListKind,
    pub query: Option<String>,
    pub user_id: Option<i64>,
    pub pages: u32,
    pub page_size: Option<u32>,
    pub sort: Option<String>,
    pub output: OutputFormat,
}

pub struct CommandExecutor {
    client_config: ClientConfig,
    credential_path: PathBuf,
    output_manager: OutputManager,
}

impl CommandExecutor {
    pub fn new(config: AppConfig, base_url: Option<String>) -> Result<Self> {
        Self::with_environment(config, ClientConfig::from_env(), base_url)
    }

    /// Layer the config file over `environment`, then the `--base-url` flag.
    fn with_environment(
        config: AppConfig,
        environment: ClientConfig,
        base_url: Option<String>,
    ) -> Result<Self> {
        let mut client_config = config.client.apply(environment);
        if let Some(base_url) = base_url {
            client_config.base_url = base_url;
        }

        Ok(Self {
            client_config,
            credential_path: config.credential_path()?,
            output_manager: OutputManager::new(cfg!(feature = "colored-output")),
        })
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let session = RecipeSession::new(self.client_config.clone())?;
        session.login(username, password).await?;

        if let Some(credential) = session.store().current() {
            config::save_credential(&self.credential_path, &credential)?;
        }
        println!("✓ Signed in as {username}");
        Ok(())
    }

    pub fn logout(&self) -> Result<()> {
        if config::remove_credential(&self.credential_path)? {
            println!("✓ Signed out");
        } else {
            println!("Not signed in");
        }
        Ok(())
    }

    pub async fn list(&self, options: ListOptions) -> Result<()> {
        let list = resolve_list(options.kind, options.query, options.user_id)?;
        if options.pages == 0 {
            return Err(CliError::InvalidInput("--pages must be at least 1".to_string()));
        }

        let credential =
            config::load_credential(&self.credential_path)?.ok_or(CliError::NotSignedIn)?;

        let mut client_config = self.client_config.clone();
        if let Some(page_size) = options.page_size {
            client_config.page_size = page_size;
        }
        if let Some(sort) = options.sort {
            client_config.default_sort = sort;
        }

        let store = Arc::new(CredentialStore::with_credential(credential));
        let loaded_epoch = store.epoch();
        let session = RecipeSession::with_store(client_config, store)?;

        let fetcher = session.fetcher(&list)?;
        let mut events = fetcher.events();

        for page in 0..options.pages {
            match fetcher.load_more().await {
                LoadOutcome::Loaded { received, last_page } => {
                    debug!(page, received, last_page, "Page loaded");
                    if last_page {
                        break;
                    }
                }
                LoadOutcome::Skipped => break,
                LoadOutcome::Discarded => {
                    warn!(page, "Page response discarded");
                    break;
                }
                LoadOutcome::NotSignedIn => return Err(CliError::NotSignedIn),
                LoadOutcome::SessionExpired => {
                    config::remove_credential(&self.credential_path)?;
                    return Err(CliError::SessionExpired);
                }
                LoadOutcome::Failed => {
                    let reason = match events.try_recv() {
                        Ok(ListEvent::LoadFailed { reason, .. }) => reason,
                        _ => "request failed".to_string(),
                    };
                    return Err(CliError::LoadFailed {
                        list: list.name().to_string(),
                        reason,
                    });
                }
            }
        }

        // Keep a renewed credential for the next run.
        if session.store().epoch() != loaded_epoch {
            if let Some(credential) = session.store().current() {
                config::save_credential(&self.credential_path, &credential)?;
                info!("Stored renewed credential");
            }
        }

        let state = fetcher.state();
        let rendered = self.output_manager.format_recipes(
            list.name(),
            &state.items,
            state.is_last_page,
            options.output,
        )?;
        println!("{rendered}");
        Ok(())
    }
}

/// Turn the command-line list selection into a server list.
pub fn resolve_list(
    kind: ListKind,
    query: Option<String>,
    user_id: Option<i64>,
) -> Result<RecipeList> {
    match kind {
        ListKind::Feed => Ok(RecipeList::HomeFeed),
        ListKind::Bookmarks => Ok(RecipeList::Bookmarks),
        ListKind::Search => match query.map(|q| q.trim().to_string()) {
            Some(query) if !query.is_empty() => Ok(RecipeList::Search { query }),
            _ => Err(CliError::InvalidInput(
                "`search` needs a non-empty --query".to_string(),
            )),
        },
        ListKind::User => user_id
            .map(|user_id| RecipeList::UserRecipes { user_id })
            .ok_or_else(|| CliError::InvalidInput("`user` needs --user-id".to_string())),
    }
}
