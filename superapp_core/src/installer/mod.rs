//! Installation and sync: reconciles remote entitlements against the local
//! app set and runs downloads one at a time.

mod catalog;
mod error;
mod fs_store;
mod plan;
mod queue;
mod sync;

pub use catalog::JsonCatalog;
pub use error::InstallError;
pub use fs_store::FsPackageStore;
pub use plan::SyncPlan;
pub use queue::{EnqueueOutcome, InstallOutcome, InstallQueue};
pub use sync::{SyncController, SyncFailure, SyncProgress, SyncReport, SyncStatus};

use crate::registry::MicroApp;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub type Result<T> = std::result::Result<T, InstallError>;

/// Shared flag telling background work whether its owner is still around.
///
/// Cloned into every task that may outlive the component that started it.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn shut_down(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a successful package download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPackage {
    pub web_view_uri: String,
    pub client_id: Option<String>,
    pub display_mode: Option<String>,
}

impl InstalledPackage {
    pub fn new(web_view_uri: impl Into<String>) -> Self {
        Self {
            web_view_uri: web_view_uri.into(),
            client_id: None,
            display_mode: None,
        }
    }
}

/// Persists and removes app packages on the device
#[async_trait]
pub trait PackageStore: Send + Sync {
    async fn download_package(&self, app_id: &str, download_url: &str) -> Result<InstalledPackage>;

    async fn remove_package(&self, app_id: &str) -> Result<()>;
}

/// One app the current user is entitled to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entitlement {
    pub app_id: String,
}

/// Remote source of the app catalog and the user's entitlements
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_catalog(&self) -> Result<Vec<MicroApp>>;

    async fn fetch_entitlements(&self) -> Result<Vec<Entitlement>>;
}
