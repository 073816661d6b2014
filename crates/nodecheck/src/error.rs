use std::io::Error as IoError;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeCheckError {
    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("failed to read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: IoError,
    },
    #[error("failed to write config {}: {source}", path.display())]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: IoError,
    },
    #[error("failed to parse config {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
    #[error("config path unavailable: neither XDG_CONFIG_HOME nor HOME is set")]
    ConfigPathUnavailable,
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl NodeCheckError {
    pub(crate) fn invalid_endpoint(endpoint: &str, reason: impl Into<String>) -> Self {
        Self::InvalidEndpoint { endpoint: endpoint.to_string(), reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, NodeCheckError>;
