use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Client error: {0}")]
    Client(#[from] recipe_feed::Error),

    #[error("Invalid config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not signed in - run `recipe-cli login` first")]
    NotSignedIn,

    #[error("Session expired - run `recipe-cli login` again")]
    SessionExpired,

    #[error("Failed to load {list}: {reason}")]
    LoadFailed { list: String, reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Could not determine a configuration directory")]
    NoConfigDir,
}
