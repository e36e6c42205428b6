use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Invalid message format: missing topic")]
    MissingTopic,

    #[error("Invalid parameters for {topic}: {reason}")]
    InvalidParams { topic: String, reason: String },

    #[error("Handler failed: {0}")]
    Handler(String),
}
