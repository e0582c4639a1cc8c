//! Error types for the rebalancer.

use std::path::PathBuf;

use costbook::CalcError;
use costbook_broker::BrokerError;

/// All errors that can occur during rebalancer operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("no configuration for account \"{account}\" in {}", dir.display())]
    ConfigNotFound { account: String, dir: PathBuf },

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to decode {path}: {source}")]
    ConfigJson {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("invalid date {input:?}: {reason}")]
    Date { input: String, reason: String },

    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error("calculation failed: {0}")]
    Calc(#[from] CalcError),

    #[error("prompt failed: {0}")]
    Prompt(String),

    #[error("failed to encode JSON output: {0}")]
    Output(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
