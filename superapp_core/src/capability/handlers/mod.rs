//! Built-in leaf capabilities.

mod alert;
mod device;
mod local_data;
mod native_log;
mod qr_request;
mod token;

pub use alert::{AlertHandler, ConfirmAlertHandler};
pub use device::{GoBackHandler, SafeAreaInsetsHandler};
pub use local_data::{GetLocalDataHandler, SaveLocalDataHandler};
pub use native_log::NativeLogHandler;
pub use qr_request::{QrRequestHandler, QR_REQUEST_TOPIC};
pub use token::TokenHandler;

use super::BridgeHandler;
use crate::bridge::{BridgeContext, BridgeError};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

/// Every handler the host ships with
pub fn builtin() -> Vec<Arc<dyn BridgeHandler>> {
    vec![
        Arc::new(TokenHandler),
        Arc::new(QrRequestHandler),
        Arc::new(AlertHandler),
        Arc::new(ConfirmAlertHandler),
        Arc::new(NativeLogHandler),
        Arc::new(SaveLocalDataHandler),
        Arc::new(GetLocalDataHandler),
        Arc::new(SafeAreaInsetsHandler),
        Arc::new(GoBackHandler),
    ]
}

/// Decode handler params, rejecting the request when they do not fit
fn params_or_reject<T: DeserializeOwned>(params: Value, ctx: &BridgeContext) -> Option<T> {
    match serde_json::from_value(params) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            let error = BridgeError::InvalidParams {
                topic: ctx.topic().to_string(),
                reason: e.to_string(),
            };
            warn!("{}", error);
            ctx.reject(error.to_string());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_builtin_topics_are_unique() {
        let handlers = builtin();
        let topics: HashSet<&str> = handlers.iter().map(|handler| handler.topic()).collect();
        assert_eq!(topics.len(), handlers.len());
        assert!(topics.contains(QR_REQUEST_TOPIC));
        assert!(topics.contains(crate::token::TOKEN_TOPIC));
    }
}
