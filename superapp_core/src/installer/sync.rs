use super::{
    error::InstallError, plan::SyncPlan, CatalogSource, Liveness, PackageStore, Result,
};
use crate::host::HostUi;
use crate::registry::{AppRegistry, StatusUpdate};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

const FAILURE_TITLE: &str = "Error";
const INSTALL_FAILURE_MESSAGE: &str = "Installation failed try again later";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncProgress {
    pub done: usize,
    pub total: usize,
}

/// Observable state of the controller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStatus {
    pub syncing: bool,
    /// e.g. `Removing Payslip` or `Downloading Payslip`
    pub current_action: Option<String>,
    pub progress: SyncProgress,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFailure {
    pub app_id: String,
    pub error: String,
}

/// What one sync pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub removed: Vec<String>,
    pub installed: Vec<String>,
    pub failures: Vec<SyncFailure>,
    pub total: usize,
}

impl SyncReport {
    pub fn done(&self) -> usize {
        self.removed.len() + self.installed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Resets the running flag and the status once a pass ends, however it ends
struct PassGuard<'a> {
    controller: &'a SyncController,
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.controller.status.send_modify(|status| {
            status.syncing = false;
            status.current_action = None;
        });
        self.controller.running.store(false, Ordering::Release);
    }
}

/// Reconciles the remote allow-list against the locally downloaded apps.
///
/// Removals run first, then installs, strictly one at a time. A failed item
/// is alerted and skipped: the progress counter does not advance for it and
/// it keeps its previous state, so the next pass retries it.
pub struct SyncController {
    registry: AppRegistry,
    packages: Arc<dyn PackageStore>,
    ui: Arc<dyn HostUi>,
    liveness: Liveness,
    running: AtomicBool,
    status: watch::Sender<SyncStatus>,
}

impl SyncController {
    pub fn new(
        registry: AppRegistry,
        packages: Arc<dyn PackageStore>,
        ui: Arc<dyn HostUi>,
        liveness: Liveness,
    ) -> Self {
        let (status, _) = watch::channel(SyncStatus::default());
        Self {
            registry,
            packages,
            ui,
            liveness,
            running: AtomicBool::new(false),
            status,
        }
    }

    pub fn registry(&self) -> &AppRegistry {
        &self.registry
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    pub fn current_status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    pub fn is_syncing(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Fetch the catalog and entitlements, then reconcile against them
    pub async fn sync_from_remote(&self, source: &dyn CatalogSource) -> Result<SyncReport> {
        let catalog = source.fetch_catalog().await?;
        self.registry.apply_catalog(catalog);

        let allowed: Vec<String> = source
            .fetch_entitlements()
            .await?
            .into_iter()
            .map(|entitlement| entitlement.app_id)
            .collect();
        self.sync(&allowed).await
    }

    /// Run one reconciliation pass against `allowed`
    pub async fn sync(&self, allowed: &[String]) -> Result<SyncReport> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Sync requested while another pass is running");
            return Err(InstallError::SyncInProgress);
        }
        let _guard = PassGuard { controller: self };

        let plan = SyncPlan::compute(allowed, &self.registry.downloaded_ids());
        let total = plan.total();
        info!(
            "Sync pass: {} to remove, {} to install",
            plan.to_remove.len(),
            plan.to_install.len()
        );
        self.publish(|status| {
            status.syncing = true;
            status.current_action = None;
            status.progress = SyncProgress { done: 0, total };
        });

        let mut report = SyncReport {
            total,
            ..SyncReport::default()
        };

        for app_id in &plan.to_remove {
            if !self.liveness.is_alive() {
                info!("Owner gone, stopping sync before removing {}", app_id);
                return Ok(report);
            }
            let name = self.display_name(app_id);
            self.set_action(format!("Removing {}", name));

            match self.remove_one(app_id).await {
                Ok(()) => {
                    report.removed.push(app_id.clone());
                    self.set_done(report.done(), total);
                }
                Err(e) => {
                    error!("Failed to remove {}: {}", app_id, e);
                    self.alert(&format!("Unable to remove {}, it will be retried", name));
                    report.failures.push(SyncFailure {
                        app_id: app_id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        for app_id in &plan.to_install {
            if !self.liveness.is_alive() {
                info!("Owner gone, stopping sync before installing {}", app_id);
                return Ok(report);
            }
            let name = self.display_name(app_id);
            self.set_action(format!("Downloading {}", name));

            match self.install_one(app_id).await {
                Ok(()) => {
                    report.installed.push(app_id.clone());
                    self.set_done(report.done(), total);
                }
                Err(InstallError::AlreadyDownloading(_)) => {
                    debug!("{} is already downloading, leaving it to the queue", app_id);
                }
                Err(InstallError::UnknownApp(_)) => {
                    debug!("{} is entitled but not in the catalog, skipping", app_id);
                }
                Err(e) => {
                    error!("Failed to install {}: {}", app_id, e);
                    self.alert(INSTALL_FAILURE_MESSAGE);
                    report.failures.push(SyncFailure {
                        app_id: app_id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Sync pass finished: {}/{} done, {} failed",
            report.done(),
            total,
            report.failures.len()
        );
        Ok(report)
    }

    /// User-initiated removal; mandatory apps are refused
    pub async fn remove_app(&self, app_id: &str) -> Result<()> {
        let app = self
            .registry
            .get(app_id)
            .ok_or_else(|| InstallError::UnknownApp(app_id.to_string()))?;
        if app.is_mandatory() {
            return Err(InstallError::MandatoryApp(app_id.to_string()));
        }
        if !app.is_downloaded() {
            debug!("{} is not downloaded, nothing to remove", app_id);
            return Ok(());
        }
        self.remove_one(app_id).await
    }

    async fn remove_one(&self, app_id: &str) -> Result<()> {
        self.packages.remove_package(app_id).await?;
        self.registry
            .apply_status(StatusUpdate::not_downloaded(app_id))?;
        info!("Removed {}", app_id);
        Ok(())
    }

    async fn install_one(&self, app_id: &str) -> Result<()> {
        let download_url = self
            .registry
            .read_app(app_id, |app| {
                app.latest_version().map(|version| version.download_url.clone())
            })
            .ok_or_else(|| InstallError::UnknownApp(app_id.to_string()))?
            .ok_or_else(|| InstallError::NoVersion(app_id.to_string()))?;

        if !self.registry.mark_downloading(app_id) {
            return Err(InstallError::AlreadyDownloading(app_id.to_string()));
        }

        let result: Result<()> = async {
            let package = self
                .packages
                .download_package(app_id, &download_url)
                .await?;
            let mut update = StatusUpdate::downloaded(app_id, package.web_view_uri);
            update.client_id = package.client_id;
            update.display_mode = package.display_mode;
            self.registry.apply_status(update)?;
            Ok(())
        }
        .await;

        self.registry.clear_downloading(app_id);
        if result.is_ok() {
            info!("Installed {}", app_id);
        }
        result
    }

    fn display_name(&self, app_id: &str) -> String {
        self.registry
            .read_app(app_id, |app| app.display_name().to_string())
            .unwrap_or_else(|| app_id.to_string())
    }

    fn publish(&self, update: impl FnOnce(&mut SyncStatus)) {
        if self.liveness.is_alive() {
            self.status.send_modify(update);
        }
    }

    fn set_action(&self, action: String) {
        debug!("{}", action);
        self.publish(|status| status.current_action = Some(action));
    }

    fn set_done(&self, done: usize, total: usize) {
        self.publish(|status| status.progress = SyncProgress { done, total });
    }

    fn alert(&self, message: &str) {
        if self.liveness.is_alive() {
            self.ui.alert(FAILURE_TITLE, message, "OK");
        }
    }
}
