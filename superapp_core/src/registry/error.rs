use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("App not found: {0}")]
    NotFound(String),

    #[error("Invalid status transition for {app_id}: {reason}")]
    InvalidTransition { app_id: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
