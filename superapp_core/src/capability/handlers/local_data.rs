use super::params_or_reject;
use crate::bridge::{BridgeContext, Result};
use crate::capability::BridgeHandler;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Deserialize)]
struct SaveParams {
    key: String,
    value: Value,
}

#[derive(Deserialize)]
struct GetParams {
    key: String,
}

/// Stores a value in the app's private key/value space
pub struct SaveLocalDataHandler;

#[async_trait]
impl BridgeHandler for SaveLocalDataHandler {
    fn topic(&self) -> &'static str {
        "save_local_data"
    }

    async fn handle(&self, params: Value, ctx: &mut BridgeContext) -> Result<()> {
        let Some(params) = params_or_reject::<SaveParams>(params, ctx) else {
            return Ok(());
        };
        ctx.local_data()
            .save(ctx.app_id(), &params.key, params.value);
        ctx.resolve(Value::Null);
        Ok(())
    }
}

/// Reads a value back; a missing key resolves with `{"value": null}`
pub struct GetLocalDataHandler;

#[async_trait]
impl BridgeHandler for GetLocalDataHandler {
    fn topic(&self) -> &'static str {
        "get_local_data"
    }

    async fn handle(&self, params: Value, ctx: &mut BridgeContext) -> Result<()> {
        let Some(params) = params_or_reject::<GetParams>(params, ctx) else {
            return Ok(());
        };
        let value = ctx
            .local_data()
            .get(ctx.app_id(), &params.key)
            .unwrap_or(Value::Null);
        ctx.resolve(json!({ "value": value }));
        Ok(())
    }
}
