use crate::bridge::{BridgeContext, Result};
use crate::capability::BridgeHandler;
use crate::token::{TokenRequest, TOKEN_TOPIC};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

/// Hands the guest a bearer token through the session's broker
pub struct TokenHandler;

#[async_trait]
impl BridgeHandler for TokenHandler {
    fn topic(&self) -> &'static str {
        TOKEN_TOPIC
    }

    async fn handle(&self, _params: Value, ctx: &mut BridgeContext) -> Result<()> {
        let responder = ctx.responder();
        let broker = ctx.token_broker().clone();
        let outcome = broker
            .request_token(Box::new(move |token: &str| {
                responder.resolve(Value::String(token.to_string()))
            }))
            .await;

        if outcome != TokenRequest::Resolved {
            debug!(
                "Token request {:?} for {} is waiting",
                ctx.request_id(),
                ctx.app_id()
            );
        }
        Ok(())
    }
}
