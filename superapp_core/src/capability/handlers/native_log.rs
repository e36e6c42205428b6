use super::params_or_reject;
use crate::bridge::{BridgeContext, Result};
use crate::capability::BridgeHandler;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

#[derive(Deserialize)]
struct LogParams {
    #[serde(default)]
    level: Option<String>,
    message: String,
    #[serde(default)]
    data: Value,
}

/// Forwards guest log lines into the host's tracing output
pub struct NativeLogHandler;

#[async_trait]
impl BridgeHandler for NativeLogHandler {
    fn topic(&self) -> &'static str {
        "native_log"
    }

    async fn handle(&self, params: Value, ctx: &mut BridgeContext) -> Result<()> {
        let Some(params) = params_or_reject::<LogParams>(params, ctx) else {
            return Ok(());
        };
        let app_id = ctx.app_id();
        let message = params.message;
        let data = params.data;

        match params.level.as_deref().unwrap_or("info") {
            "error" => error!(app_id, %data, "[guest] {}", message),
            "warn" => warn!(app_id, %data, "[guest] {}", message),
            "debug" => debug!(app_id, %data, "[guest] {}", message),
            _ => info!(app_id, %data, "[guest] {}", message),
        }
        ctx.resolve(Value::Null);
        Ok(())
    }
}
