use super::{
    app::{AppStatus, MicroApp, DEFAULT_DISPLAY_MODE},
    error::RegistryError,
    Result,
};
use crate::capability::AllowList;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info};

/// Owned, versioned store of micro-app records.
///
/// Every mutation goes through one of the entry points below and bumps the
/// revision. Status transitions and downloading markers are crate-private so
/// only the installer can drive them; readers use the query methods.
#[derive(Debug, Clone, Default)]
pub struct AppRegistry {
    inner: Arc<RwLock<RegistryState>>,
}

#[derive(Debug, Default)]
struct RegistryState {
    revision: u64,
    apps: Vec<MicroApp>,
    downloading: Vec<String>,
}

impl RegistryState {
    fn find_mut(&mut self, app_id: &str) -> Option<&mut MicroApp> {
        self.apps.iter_mut().find(|app| app.app_id == app_id)
    }

    fn bump(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }
}

/// Session state written by the installer after a load or removal
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub app_id: String,
    pub status: AppStatus,
    pub web_view_uri: Option<String>,
    pub client_id: Option<String>,
    pub display_mode: Option<String>,
}

impl StatusUpdate {
    pub fn downloaded(app_id: impl Into<String>, web_view_uri: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            status: AppStatus::Downloaded,
            web_view_uri: Some(web_view_uri.into()),
            client_id: None,
            display_mode: None,
        }
    }

    pub fn not_downloaded(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            status: AppStatus::NotDownloaded,
            web_view_uri: None,
            client_id: None,
            display_mode: None,
        }
    }
}

impl AppRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry seeded with records, e.g. restored from a snapshot
    pub fn with_apps(apps: Vec<MicroApp>) -> Self {
        Self::restore(apps, 0)
    }

    pub(crate) fn restore(apps: Vec<MicroApp>, revision: u64) -> Self {
        Self {
            inner: Arc::new(RwLock::new(RegistryState {
                revision,
                apps,
                downloading: Vec::new(),
            })),
        }
    }

    /// Current revision; increases on every mutation
    pub fn revision(&self) -> u64 {
        self.inner.read().revision
    }

    /// Get a copy of one app record
    pub fn get(&self, app_id: &str) -> Option<MicroApp> {
        self.read_app(app_id, MicroApp::clone)
    }

    /// Run `f` against one app record without cloning it
    pub fn read_app<R>(&self, app_id: &str, f: impl FnOnce(&MicroApp) -> R) -> Option<R> {
        let state = self.inner.read();
        state.apps.iter().find(|app| app.app_id == app_id).map(f)
    }

    /// List all app records in catalog order
    pub fn list(&self) -> Vec<MicroApp> {
        self.inner.read().apps.clone()
    }

    /// Ids of apps whose package is installed on this device
    pub fn downloaded_ids(&self) -> Vec<String> {
        self.inner
            .read()
            .apps
            .iter()
            .filter(|app| app.is_downloaded())
            .map(|app| app.app_id.clone())
            .collect()
    }

    /// Ids of apps with a download in progress
    pub fn downloading(&self) -> Vec<String> {
        self.inner.read().downloading.clone()
    }

    pub fn is_downloading(&self, app_id: &str) -> bool {
        self.inner.read().downloading.iter().any(|id| id == app_id)
    }

    /// Topics `app_id` may dispatch, under the default config key
    pub fn allow_list(&self, app_id: &str) -> AllowList {
        AllowList::resolve(self, app_id)
    }

    pub fn len(&self) -> usize {
        self.inner.read().apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().apps.is_empty()
    }

    /// Merge the remote catalog into the registry.
    ///
    /// Known apps get their metadata replaced while keeping session fields.
    /// Unknown apps are appended as given. Records missing from the catalog
    /// are kept so the store listing can still show them.
    pub fn apply_catalog(&self, apps: Vec<MicroApp>) -> u64 {
        let mut state = self.inner.write();
        let mut added = 0usize;
        for incoming in apps {
            match state.find_mut(&incoming.app_id) {
                Some(existing) => existing.merge_metadata(incoming),
                None => {
                    added += 1;
                    state.apps.push(incoming);
                }
            }
        }
        let revision = state.bump();
        info!(
            "Applied catalog: {} apps ({} new), revision {}",
            state.apps.len(),
            added,
            revision
        );
        revision
    }

    /// Store a freshly exchanged credential for an app
    pub fn apply_token_update(&self, app_id: &str, exchanged_token: &str) -> Result<u64> {
        let mut state = self.inner.write();
        let app = state
            .find_mut(app_id)
            .ok_or_else(|| RegistryError::NotFound(app_id.to_string()))?;
        app.exchanged_token = Some(exchanged_token.to_string());
        debug!("Updated exchanged token for {}", app_id);
        Ok(state.bump())
    }

    pub(crate) fn apply_status(&self, update: StatusUpdate) -> Result<u64> {
        let mut state = self.inner.write();
        let app = state
            .find_mut(&update.app_id)
            .ok_or_else(|| RegistryError::NotFound(update.app_id.clone()))?;

        match update.status {
            AppStatus::Downloaded => {
                let uri = update
                    .web_view_uri
                    .filter(|uri| !uri.is_empty())
                    .ok_or_else(|| RegistryError::InvalidTransition {
                        app_id: update.app_id.clone(),
                        reason: "downloaded app needs an entry point".to_string(),
                    })?;
                app.status = Some(AppStatus::Downloaded);
                app.web_view_uri = Some(uri);
                app.client_id = update.client_id;
                app.display_mode =
                    Some(update.display_mode.unwrap_or_else(|| DEFAULT_DISPLAY_MODE.to_string()));
            }
            AppStatus::NotDownloaded => {
                app.status = Some(AppStatus::NotDownloaded);
                app.web_view_uri = None;
                app.exchanged_token = None;
            }
        }

        debug!("{} is now {:?}", update.app_id, update.status);
        Ok(state.bump())
    }

    pub(crate) fn mark_downloading(&self, app_id: &str) -> bool {
        let mut state = self.inner.write();
        if state.downloading.iter().any(|id| id == app_id) {
            return false;
        }
        state.downloading.push(app_id.to_string());
        state.bump();
        true
    }

    pub(crate) fn clear_downloading(&self, app_id: &str) {
        let mut state = self.inner.write();
        let before = state.downloading.len();
        state.downloading.retain(|id| id != app_id);
        if state.downloading.len() != before {
            state.bump();
        }
    }
}
