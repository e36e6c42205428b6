use crate::bridge::{BridgeContext, Result};
use crate::capability::BridgeHandler;
use async_trait::async_trait;
use serde_json::Value;

pub const QR_REQUEST_TOPIC: &str = "qr_request";

/// Opens the scanner; the scanned code resolves the request later
pub struct QrRequestHandler;

#[async_trait]
impl BridgeHandler for QrRequestHandler {
    fn topic(&self) -> &'static str {
        QR_REQUEST_TOPIC
    }

    async fn handle(&self, _params: Value, ctx: &mut BridgeContext) -> Result<()> {
        let responder = ctx.responder();
        ctx.scan_callback = Some(Box::new(move |code: String| {
            responder.resolve(Value::String(code))
        }));
        ctx.set_scanner_visible(true);
        Ok(())
    }
}
