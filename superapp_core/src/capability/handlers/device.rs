use crate::bridge::{BridgeContext, Result};
use crate::capability::BridgeHandler;
use async_trait::async_trait;
use serde_json::{json, Value};

pub struct SafeAreaInsetsHandler;

#[async_trait]
impl BridgeHandler for SafeAreaInsetsHandler {
    fn topic(&self) -> &'static str {
        "device_safe_area_insets"
    }

    async fn handle(&self, _params: Value, ctx: &mut BridgeContext) -> Result<()> {
        let insets = ctx.ui().safe_area_insets();
        ctx.resolve(json!({ "insets": insets }));
        Ok(())
    }
}

pub struct GoBackHandler;

#[async_trait]
impl BridgeHandler for GoBackHandler {
    fn topic(&self) -> &'static str {
        "go_back"
    }

    async fn handle(&self, _params: Value, ctx: &mut BridgeContext) -> Result<()> {
        ctx.ui().navigate_back();
        ctx.resolve(Value::Null);
        Ok(())
    }
}
