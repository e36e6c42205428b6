use super::{error::InstallError, Liveness, PackageStore};
use crate::host::HostUi;
use crate::registry::{AppRegistry, StatusUpdate};
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

#[derive(Debug, Clone, PartialEq, Eq)]
struct QueueEntry {
    app_id: String,
    download_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Queued,
    /// Already waiting in the queue or being processed by it
    AlreadyQueued,
    /// Being downloaded outside the queue, e.g. by a sync pass
    AlreadyDownloading,
    ShutDown,
}

#[derive(Debug)]
pub enum InstallOutcome {
    Installed { app_id: String },
    Failed { app_id: String, error: InstallError },
}

impl InstallOutcome {
    pub fn app_id(&self) -> &str {
        match self {
            InstallOutcome::Installed { app_id } | InstallOutcome::Failed { app_id, .. } => app_id,
        }
    }

    pub fn is_installed(&self) -> bool {
        matches!(self, InstallOutcome::Installed { .. })
    }
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<QueueEntry>,
    active: HashSet<String>,
}

struct QueueInner {
    registry: AppRegistry,
    packages: Arc<dyn PackageStore>,
    ui: Arc<dyn HostUi>,
    liveness: Liveness,
    state: Mutex<QueueState>,
    wake: Notify,
    worker: tokio::sync::Mutex<()>,
}

/// FIFO of on-demand downloads, processed one at a time.
///
/// The queue owns its worker loop and does not depend on any view being
/// alive. Registry updates always land; alerts are skipped once the owner
/// has shut down.
#[derive(Clone)]
pub struct InstallQueue {
    inner: Arc<QueueInner>,
}

impl InstallQueue {
    pub fn new(
        registry: AppRegistry,
        packages: Arc<dyn PackageStore>,
        ui: Arc<dyn HostUi>,
        liveness: Liveness,
    ) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                registry,
                packages,
                ui,
                liveness,
                state: Mutex::new(QueueState::default()),
                wake: Notify::new(),
                worker: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Number of entries waiting to start
    pub fn len(&self) -> usize {
        self.inner.state.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.state.lock().pending.is_empty()
    }

    /// Whether `app_id` is waiting or being processed
    pub fn contains(&self, app_id: &str) -> bool {
        let state = self.inner.state.lock();
        state.active.contains(app_id) || state.pending.iter().any(|e| e.app_id == app_id)
    }

    /// Queue a download unless the app is already queued or downloading
    pub fn enqueue_download(
        &self,
        app_id: impl Into<String>,
        download_url: impl Into<String>,
    ) -> EnqueueOutcome {
        let app_id = app_id.into();
        if !self.inner.liveness.is_alive() {
            debug!("Queue shut down, ignoring {}", app_id);
            return EnqueueOutcome::ShutDown;
        }

        {
            let mut state = self.inner.state.lock();
            if state.active.contains(&app_id) || state.pending.iter().any(|e| e.app_id == app_id) {
                debug!("{} is already queued", app_id);
                return EnqueueOutcome::AlreadyQueued;
            }
            if !self.inner.registry.mark_downloading(&app_id) {
                debug!("{} is already downloading", app_id);
                return EnqueueOutcome::AlreadyDownloading;
            }
            state.pending.push_back(QueueEntry {
                app_id: app_id.clone(),
                download_url: download_url.into(),
            });
        }

        info!("Queued download of {}", app_id);
        self.inner.wake.notify_one();
        EnqueueOutcome::Queued
    }

    /// Process the oldest entry, if any.
    ///
    /// Only one entry is in flight at a time, even across concurrent callers.
    pub async fn process_next(&self) -> Option<InstallOutcome> {
        let inner = &self.inner;
        let _worker = inner.worker.lock().await;

        let entry = {
            let mut state = inner.state.lock();
            let entry = state.pending.pop_front()?;
            state.active.insert(entry.app_id.clone());
            entry
        };
        let app_id = entry.app_id;

        debug!("Downloading {} from {}", app_id, entry.download_url);
        let result = match inner
            .packages
            .download_package(&app_id, &entry.download_url)
            .await
        {
            Ok(package) => {
                let mut update = StatusUpdate::downloaded(app_id.as_str(), package.web_view_uri);
                update.client_id = package.client_id;
                update.display_mode = package.display_mode;
                inner
                    .registry
                    .apply_status(update)
                    .map_err(InstallError::from)
            }
            Err(e) => Err(e),
        };

        inner.registry.clear_downloading(&app_id);
        inner.state.lock().active.remove(&app_id);

        Some(match result {
            Ok(_) => {
                info!("Installed {}", app_id);
                InstallOutcome::Installed { app_id }
            }
            Err(error) => {
                error!("Installation of {} failed: {}", app_id, error);
                if inner.liveness.is_alive() {
                    inner
                        .ui
                        .alert("Error", "Installation failed try again later", "OK");
                }
                InstallOutcome::Failed { app_id, error }
            }
        })
    }

    /// Process entries until the queue is empty
    pub async fn drain(&self) -> Vec<InstallOutcome> {
        let mut outcomes = Vec::new();
        while let Some(outcome) = self.process_next().await {
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Run the worker loop on the runtime until [`shutdown`](Self::shutdown)
    pub fn spawn_worker(&self) -> JoinHandle<()> {
        let queue = self.clone();
        tokio::spawn(async move {
            info!("Starting install queue worker");
            loop {
                while queue.process_next().await.is_some() {}
                if !queue.inner.liveness.is_alive() {
                    break;
                }
                queue.inner.wake.notified().await;
            }
            info!("Install queue worker stopped");
        })
    }

    /// Stop accepting work and drop entries that have not started.
    ///
    /// A download already in flight runs to completion.
    pub fn shutdown(&self) {
        self.inner.liveness.shut_down();
        let dropped: Vec<QueueEntry> = self.inner.state.lock().pending.drain(..).collect();
        for entry in &dropped {
            self.inner.registry.clear_downloading(&entry.app_id);
        }
        if !dropped.is_empty() {
            info!("Dropped {} queued downloads on shutdown", dropped.len());
        }
        self.inner.wake.notify_one();
    }
}
