use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use recipe_feed::{ClientConfig, Credential};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CliError, Result};

const APP_DIR: &str = "recipe-cli";
const CONFIG_FILE: &str = "config.toml";
const CREDENTIAL_FILE: &str = "credential.json";

/// Values the config file may override on top of the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_sort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renewal_timeout_secs: Option<u64>,
}

impl ClientOverrides {
    pub fn apply(&self, mut config: ClientConfig) -> ClientConfig {
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(page_size) = self.page_size {
            config.page_size = page_size;
        }
        if let Some(sort) = &self.default_sort {
            config.default_sort = sort.clone();
        }
        if let Some(secs) = self.request_timeout_secs {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.renewal_timeout_secs {
            config.renewal_timeout = Duration::from_secs(secs);
        }
        config
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub client: ClientOverrides,
    /// Where the signed-in credential is kept between runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_file: Option<PathBuf>,
}

impl AppConfig {
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
            .ok_or(CliError::NoConfigDir)
    }

    /// Load the config file, or defaults when it does not exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };

        if !path.exists() {
            debug!(path = %path.display(), "No config file; using defaults");
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(&path)?;
        toml::from_str(&raw).map_err(|source| CliError::ConfigParse { path, source })
    }

    /// Overwrite the config file with defaults.
    pub fn reset(path: Option<&Path>) -> Result<PathBuf> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, Self::default().show()?)?;
        Ok(path)
    }

    pub fn show(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn credential_path(&self) -> Result<PathBuf> {
        match &self.credential_file {
            Some(path) => Ok(path.clone()),
            None => dirs::config_dir()
                .map(|dir| dir.join(APP_DIR).join(CREDENTIAL_FILE))
                .ok_or(CliError::NoConfigDir),
        }
    }
}

pub fn load_credential(path: &Path) -> Result<Option<Credential>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&raw)?))
}

pub fn save_credential(path: &Path, credential: &Credential) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string(credential)?)?;
    Ok(())
}

pub fn remove_credential(path: &Path) -> Result<bool> {
    if path.exists() {
        fs::remove_file(path)?;
        return Ok(true);
    }
    Ok(false)
}
