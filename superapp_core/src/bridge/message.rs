use super::{error::BridgeError, Result};
use serde::Deserialize;
use serde_json::Value;

/// A request sent by the guest: `{"topic": .., "data": .., "requestId": ..}`
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeMessage {
    pub topic: String,
    pub data: Value,
    pub request_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMessage {
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    request_id: Option<String>,
}

impl BridgeMessage {
    /// Parse a raw guest payload
    pub fn parse(raw: &str) -> Result<Self> {
        let message: RawMessage = serde_json::from_str(raw)?;
        let topic = message
            .topic
            .filter(|topic| !topic.is_empty())
            .ok_or(BridgeError::MissingTopic)?;

        Ok(Self {
            topic,
            data: message.data,
            request_id: message.request_id,
        })
    }
}
