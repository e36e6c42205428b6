use super::{
    context::{BridgeContext, Responder, ScanCallback},
    error::BridgeError,
    message::BridgeMessage,
    outbound::Outbound,
};
use crate::capability::handlers::QR_REQUEST_TOPIC;
use crate::capability::{AllowList, CapabilityRegistry, ALLOWED_BRIDGE_METHODS_CONFIG_KEY};
use crate::host::HostServices;
use crate::registry::AppRegistry;
use crate::token::TokenBroker;
use futures::FutureExt;
use parking_lot::Mutex;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Why an inbound message never reached a handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    Malformed,
    MissingTopic,
    NotAllowed,
    UnknownTopic,
}

/// Outcome of one inbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Dropped(DropReason),
    Handled,
    /// The handler returned an error or panicked; nothing was sent for it
    HandlerFailed,
}

/// Dispatches messages from one guest view to capability handlers.
///
/// Every message is checked against the app's allow-list before a handler
/// is looked up. Protocol problems and handler failures are logged and
/// swallowed so the router stays usable for the next message.
pub struct BridgeRouter {
    app_id: String,
    registry: AppRegistry,
    capabilities: Arc<CapabilityRegistry>,
    broker: TokenBroker,
    outbound: Outbound,
    services: HostServices,
    allow_list_key: String,
    scan_slot: Mutex<Option<ScanCallback>>,
}

impl BridgeRouter {
    pub fn new(
        registry: AppRegistry,
        capabilities: Arc<CapabilityRegistry>,
        broker: TokenBroker,
        outbound: Outbound,
        services: HostServices,
    ) -> Self {
        Self {
            app_id: broker.session().app_id.clone(),
            registry,
            capabilities,
            broker,
            outbound,
            services,
            allow_list_key: ALLOWED_BRIDGE_METHODS_CONFIG_KEY.to_string(),
            scan_slot: Mutex::new(None),
        }
    }

    /// Read the allow-list from a different config key
    pub fn with_allow_list_key(mut self, key: impl Into<String>) -> Self {
        self.allow_list_key = key.into();
        self
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn token_broker(&self) -> &TokenBroker {
        &self.broker
    }

    /// Handle one raw message posted by the guest
    pub async fn on_message(&self, raw: &str) -> Dispatch {
        let message = match BridgeMessage::parse(raw) {
            Ok(message) => message,
            Err(BridgeError::MissingTopic) => {
                warn!("Dropping bridge message from {} without topic", self.app_id);
                return Dispatch::Dropped(DropReason::MissingTopic);
            }
            Err(e) => {
                warn!("Dropping bridge message from {}: {}", self.app_id, e);
                return Dispatch::Dropped(DropReason::Malformed);
            }
        };
        let topic = message.topic.as_str();

        let allow_list =
            AllowList::resolve_with_key(&self.registry, &self.app_id, &self.allow_list_key);
        if !allow_list.is_allowed(topic) {
            warn!("{} not allowed", topic);
            return Dispatch::Dropped(DropReason::NotAllowed);
        }

        let Some(handler) = self.capabilities.get_handler(topic) else {
            warn!("unknown topic: {}", topic);
            return Dispatch::Dropped(DropReason::UnknownTopic);
        };

        debug!(
            "Dispatching {} for {} (request {:?})",
            topic, self.app_id, message.request_id
        );
        let responder = Responder::new(topic, message.request_id.clone(), self.outbound.clone());
        let mut ctx = BridgeContext::new(
            self.app_id.as_str(),
            self.broker.token(),
            responder,
            self.broker.clone(),
            self.services.clone(),
        );

        let result = AssertUnwindSafe(handler.handle(message.data, &mut ctx))
            .catch_unwind()
            .await;

        match result {
            Ok(Ok(())) => {
                if topic == QR_REQUEST_TOPIC {
                    if let Some(callback) = ctx.scan_callback.take() {
                        *self.scan_slot.lock() = Some(callback);
                    }
                }
                Dispatch::Handled
            }
            Ok(Err(e)) => {
                error!("Bridge handler for {} failed: {}", topic, e);
                Dispatch::HandlerFailed
            }
            Err(_) => {
                error!("Bridge handler for {} panicked", topic);
                Dispatch::HandlerFailed
            }
        }
    }

    /// Hand a scanned code to the pending scan request, hiding the scanner.
    ///
    /// Returns `false` when no scan was requested.
    pub fn deliver_scan_result(&self, code: impl Into<String>) -> bool {
        let Some(callback) = self.scan_slot.lock().take() else {
            debug!("Scan result for {} with no pending request", self.app_id);
            return false;
        };
        self.services.ui.set_scanner_visible(false);
        callback(code.into());
        true
    }

    pub fn has_pending_scan(&self) -> bool {
        self.scan_slot.lock().is_some()
    }

    /// Send an unsolicited notification to the guest
    pub fn push(&self, method: impl Into<String>, data: Value) {
        self.outbound.push(method, data);
    }
}
