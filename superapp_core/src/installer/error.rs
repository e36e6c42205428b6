use crate::registry::RegistryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("Download of {app_id} failed: {reason}")]
    Download { app_id: String, reason: String },

    #[error("Removal of {app_id} failed: {reason}")]
    Remove { app_id: String, reason: String },

    #[error("Unknown app: {0}")]
    UnknownApp(String),

    #[error("No version published for {0}")]
    NoVersion(String),

    #[error("{0} is mandatory and cannot be removed")]
    MandatoryApp(String),

    #[error("Invalid app id: {0}")]
    InvalidAppId(String),

    #[error("{0} is already being downloaded")]
    AlreadyDownloading(String),

    #[error("A sync is already running")]
    SyncInProgress,

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}
