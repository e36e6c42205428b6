use super::{app::MicroApp, store::AppRegistry, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// On-disk form of the registry. Exchanged credentials are never written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySnapshot {
    pub revision: u64,
    pub saved_at: DateTime<Utc>,
    pub apps: Vec<MicroApp>,
}

impl RegistrySnapshot {
    /// Capture the current registry contents with credentials stripped
    pub fn capture(registry: &AppRegistry) -> Self {
        let apps = registry
            .list()
            .into_iter()
            .map(|mut app| {
                app.exchanged_token = None;
                app
            })
            .collect();

        Self {
            revision: registry.revision(),
            saved_at: Utc::now(),
            apps,
        }
    }
}

impl AppRegistry {
    /// Persist the registry as JSON without credentials
    pub fn save_snapshot<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let snapshot = RegistrySnapshot::capture(self);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(&snapshot)?;
        fs::write(path, json)?;
        info!(
            "Saved registry snapshot ({} apps) to {:?}",
            snapshot.apps.len(),
            path
        );
        Ok(())
    }

    /// Restore a registry from a snapshot file; a missing file yields an empty registry
    pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No registry snapshot at {:?}, starting empty", path);
            return Ok(Self::new());
        }

        let content = fs::read_to_string(path)?;
        let snapshot: RegistrySnapshot = serde_json::from_str(&content)?;
        debug!(
            "Loaded registry snapshot revision {} saved at {}",
            snapshot.revision, snapshot.saved_at
        );
        Ok(Self::restore(snapshot.apps, snapshot.revision))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{AppStatus, StatusUpdate};
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_snapshot_strips_credentials() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("state").join("apps.json");

        let registry = AppRegistry::with_apps(vec![
            MicroApp::new("wallet", "Wallet").with_config("allowedFunctions", json!(["token"])),
        ]);
        registry
            .apply_status(StatusUpdate::downloaded("wallet", "file:///apps/wallet/index.html"))
            .unwrap();
        registry.apply_token_update("wallet", "secret").unwrap();

        registry.save_snapshot(&path).unwrap();
        let raw = fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("secret"));

        let restored = AppRegistry::load_snapshot(&path).unwrap();
        let app = restored.get("wallet").unwrap();
        assert_eq!(app.status, Some(AppStatus::Downloaded));
        assert!(app.exchanged_token.is_none());
        assert_eq!(restored.revision(), registry.revision());
    }

    #[test]
    fn test_missing_snapshot_is_empty() {
        let temp_dir = tempdir().unwrap();
        let registry = AppRegistry::load_snapshot(temp_dir.path().join("none.json")).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_corrupt_snapshot_is_an_error() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("apps.json");
        fs::write(&path, "not json").unwrap();
        assert!(AppRegistry::load_snapshot(&path).is_err());
    }
}
