use super::handlers;
use crate::bridge::{BridgeContext, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// A leaf capability reachable from the guest through one topic.
///
/// Handlers answer through `ctx.resolve` / `ctx.reject`. Returning `Err`
/// is treated like a crash: the router logs it and the guest gets nothing.
#[async_trait]
pub trait BridgeHandler: Send + Sync {
    fn topic(&self) -> &'static str;

    async fn handle(&self, params: Value, ctx: &mut BridgeContext) -> Result<()>;
}

/// Static mapping from topic to handler
#[derive(Default, Clone)]
pub struct CapabilityRegistry {
    handlers: HashMap<String, Arc<dyn BridgeHandler>>,
}

impl CapabilityRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every built-in handler
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for handler in handlers::builtin() {
            registry.register(handler);
        }
        registry
    }

    /// Register a handler under its topic, returning any handler it replaced
    pub fn register(&mut self, handler: Arc<dyn BridgeHandler>) -> Option<Arc<dyn BridgeHandler>> {
        let topic = handler.topic().to_string();
        debug!("Registering bridge handler for {}", topic);
        self.handlers.insert(topic, handler)
    }

    pub fn get_handler(&self, topic: &str) -> Option<Arc<dyn BridgeHandler>> {
        self.handlers.get(topic).cloned()
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.handlers.contains_key(topic)
    }

    /// Registered topics, sorted
    pub fn topics(&self) -> Vec<&str> {
        let mut topics: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        topics.sort_unstable();
        topics
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
