//! Host-side services exposed to bridge handlers and the installer.
//!
//! Rendering is out of scope for this crate; the host application implements
//! [`HostUi`] on top of whatever view layer it uses.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// Safe-area insets of the device screen, in points
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SafeAreaInsets {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

/// User-facing surface of the host application
#[async_trait]
pub trait HostUi: Send + Sync {
    /// Show a one-button alert; does not wait for dismissal
    fn alert(&self, title: &str, message: &str, button_text: &str);

    /// Ask the user to confirm; resolves to `true` when confirmed
    async fn confirm(
        &self,
        title: &str,
        message: &str,
        cancel_text: &str,
        confirm_text: &str,
    ) -> bool;

    fn set_scanner_visible(&self, visible: bool);

    fn navigate_back(&self);

    fn safe_area_insets(&self) -> SafeAreaInsets;
}

/// Per-app key/value storage backing the local data capabilities
pub trait LocalDataStore: Send + Sync {
    fn save(&self, app_id: &str, key: &str, value: Value);

    fn get(&self, app_id: &str, key: &str) -> Option<Value>;
}

/// In-memory [`LocalDataStore`]
#[derive(Debug, Default)]
pub struct InMemoryDataStore {
    entries: DashMap<(String, String), Value>,
}

impl InMemoryDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl LocalDataStore for InMemoryDataStore {
    fn save(&self, app_id: &str, key: &str, value: Value) {
        self.entries
            .insert((app_id.to_string(), key.to_string()), value);
    }

    fn get(&self, app_id: &str, key: &str) -> Option<Value> {
        self.entries
            .get(&(app_id.to_string(), key.to_string()))
            .map(|entry| entry.value().clone())
    }
}

/// [`HostUi`] for hosts without a screen: alerts go to the log and
/// confirmations are declined
#[derive(Debug, Default)]
pub struct HeadlessUi;

#[async_trait]
impl HostUi for HeadlessUi {
    fn alert(&self, title: &str, message: &str, _button_text: &str) {
        info!("[alert] {}: {}", title, message);
    }

    async fn confirm(
        &self,
        title: &str,
        message: &str,
        _cancel_text: &str,
        _confirm_text: &str,
    ) -> bool {
        info!("[confirm] {}: {} (declined)", title, message);
        false
    }

    fn set_scanner_visible(&self, visible: bool) {
        debug!("Scanner visible: {}", visible);
    }

    fn navigate_back(&self) {
        debug!("Navigate back requested");
    }

    fn safe_area_insets(&self) -> SafeAreaInsets {
        SafeAreaInsets::default()
    }
}

/// Bundle of host services handed to every bridge context
#[derive(Clone)]
pub struct HostServices {
    pub ui: Arc<dyn HostUi>,
    pub local_data: Arc<dyn LocalDataStore>,
}

impl HostServices {
    pub fn new(ui: Arc<dyn HostUi>, local_data: Arc<dyn LocalDataStore>) -> Self {
        Self { ui, local_data }
    }

    /// Services backed by [`HeadlessUi`] and an [`InMemoryDataStore`]
    pub fn headless() -> Self {
        Self::new(Arc::new(HeadlessUi), Arc::new(InMemoryDataStore::new()))
    }
}
