use super::params_or_reject;
use crate::bridge::{BridgeContext, Result};
use crate::capability::BridgeHandler;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlertParams {
    title: String,
    message: String,
    #[serde(default = "default_button")]
    button_text: String,
}

fn default_button() -> String {
    "OK".to_string()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfirmParams {
    title: String,
    message: String,
    #[serde(default = "default_cancel")]
    cancel_button_text: String,
    #[serde(default = "default_confirm")]
    confirm_button_text: String,
}

fn default_cancel() -> String {
    "Cancel".to_string()
}

fn default_confirm() -> String {
    "OK".to_string()
}

pub struct AlertHandler;

#[async_trait]
impl BridgeHandler for AlertHandler {
    fn topic(&self) -> &'static str {
        "alert"
    }

    async fn handle(&self, params: Value, ctx: &mut BridgeContext) -> Result<()> {
        let Some(params) = params_or_reject::<AlertParams>(params, ctx) else {
            return Ok(());
        };
        ctx.ui()
            .alert(&params.title, &params.message, &params.button_text);
        ctx.resolve(Value::Null);
        Ok(())
    }
}

/// Resolves with `"confirm"` or `"cancel"`
pub struct ConfirmAlertHandler;

#[async_trait]
impl BridgeHandler for ConfirmAlertHandler {
    fn topic(&self) -> &'static str {
        "confirm_alert"
    }

    async fn handle(&self, params: Value, ctx: &mut BridgeContext) -> Result<()> {
        let Some(params) = params_or_reject::<ConfirmParams>(params, ctx) else {
            return Ok(());
        };
        let ui = ctx.ui().clone();
        let confirmed = ui
            .confirm(
                &params.title,
                &params.message,
                &params.cancel_button_text,
                &params.confirm_button_text,
            )
            .await;
        let choice = if confirmed { "confirm" } else { "cancel" };
        ctx.resolve(Value::String(choice.to_string()));
        Ok(())
    }
}
