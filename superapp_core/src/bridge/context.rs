use super::outbound::Outbound;
use crate::host::{HostServices, HostUi, LocalDataStore};
use crate::token::{RefreshOutcome, TokenBroker};
use serde_json::Value;
use std::sync::Arc;

/// Callback receiving the next scanned code
pub type ScanCallback = Box<dyn FnOnce(String) + Send>;

/// Correlated reply handle for one guest request.
///
/// Cloneable so handlers can answer after the context is gone, e.g. from a
/// token waiter or a scan callback.
#[derive(Debug, Clone)]
pub struct Responder {
    topic: String,
    request_id: Option<String>,
    outbound: Outbound,
}

impl Responder {
    pub fn new(topic: impl Into<String>, request_id: Option<String>, outbound: Outbound) -> Self {
        Self {
            topic: topic.into(),
            request_id,
            outbound,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn resolve(&self, data: Value) {
        self.outbound
            .resolve(&self.topic, data, self.request_id.clone());
    }

    /// Resolve a different logical request than the one that created this responder
    pub fn resolve_for(&self, data: Value, request_id: &str) {
        self.outbound
            .resolve(&self.topic, data, Some(request_id.to_string()));
    }

    pub fn reject(&self, error: impl Into<String>) {
        self.outbound
            .reject(&self.topic, error.into(), self.request_id.clone());
    }

    pub fn reject_for(&self, error: impl Into<String>, request_id: &str) {
        self.outbound
            .reject(&self.topic, error.into(), Some(request_id.to_string()));
    }
}

/// Per-invocation value handed to a capability handler
pub struct BridgeContext {
    app_id: String,
    token: Option<String>,
    responder: Responder,
    broker: TokenBroker,
    services: HostServices,
    /// Slot a multi-step handler fills to receive the next scan result
    pub scan_callback: Option<ScanCallback>,
}

impl BridgeContext {
    pub fn new(
        app_id: impl Into<String>,
        token: Option<String>,
        responder: Responder,
        broker: TokenBroker,
        services: HostServices,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            token,
            responder,
            broker,
            services,
            scan_callback: None,
        }
    }

    pub fn topic(&self) -> &str {
        self.responder.topic()
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn request_id(&self) -> Option<&str> {
        self.responder.request_id()
    }

    /// Credential cached by the session when the message arrived
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn resolve(&self, data: Value) {
        self.responder.resolve(data);
    }

    pub fn resolve_with_id(&self, data: Value, request_id: &str) {
        self.responder.resolve_for(data, request_id);
    }

    pub fn reject(&self, error: impl Into<String>) {
        self.responder.reject(error);
    }

    pub fn reject_with_id(&self, error: impl Into<String>, request_id: &str) {
        self.responder.reject_for(error, request_id);
    }

    pub fn responder(&self) -> Responder {
        self.responder.clone()
    }

    pub fn token_broker(&self) -> &TokenBroker {
        &self.broker
    }

    pub async fn refresh_token(&self) -> RefreshOutcome {
        self.broker.refresh().await
    }

    pub fn ui(&self) -> &Arc<dyn HostUi> {
        &self.services.ui
    }

    pub fn local_data(&self) -> &Arc<dyn LocalDataStore> {
        &self.services.local_data
    }

    pub fn set_scanner_visible(&self, visible: bool) {
        self.services.ui.set_scanner_visible(visible);
    }
}
