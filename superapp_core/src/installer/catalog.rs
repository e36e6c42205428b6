use super::{error::InstallError, CatalogSource, Entitlement, Result};
use crate::registry::MicroApp;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::debug;

/// [`CatalogSource`] backed by two JSON files: an array of catalog entries
/// and an array of `{"appId": ..}` entitlements
#[derive(Debug, Clone)]
pub struct JsonCatalog {
    catalog_path: PathBuf,
    entitlements_path: PathBuf,
}

impl JsonCatalog {
    pub fn new(catalog_path: impl Into<PathBuf>, entitlements_path: impl Into<PathBuf>) -> Self {
        Self {
            catalog_path: catalog_path.into(),
            entitlements_path: entitlements_path.into(),
        }
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| InstallError::Catalog(format!("{}: {}", path.display(), e)))?;
    Ok(serde_json::from_str(&raw)?)
}

#[async_trait]
impl CatalogSource for JsonCatalog {
    async fn fetch_catalog(&self) -> Result<Vec<MicroApp>> {
        let apps: Vec<MicroApp> = read_json(&self.catalog_path).await?;
        debug!("Read {} catalog entries", apps.len());
        Ok(apps)
    }

    async fn fetch_entitlements(&self) -> Result<Vec<Entitlement>> {
        read_json(&self.entitlements_path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_reads_catalog_and_entitlements() {
        let dir = TempDir::new().unwrap();
        let catalog = dir.path().join("catalog.json");
        let entitlements = dir.path().join("entitlements.json");
        std::fs::write(
            &catalog,
            r#"[{"appId": "cards", "name": "Cards", "isMandatory": 0,
                "versions": [{"version": "1.0.0", "downloadUrl": "file:///pkg/cards"}]}]"#,
        )
        .unwrap();
        std::fs::write(&entitlements, r#"[{"appId": "cards"}]"#).unwrap();

        let source = JsonCatalog::new(&catalog, &entitlements);
        let apps = source.fetch_catalog().await.unwrap();
        assert_eq!(apps[0].app_id, "cards");
        assert_eq!(
            source.fetch_entitlements().await.unwrap(),
            vec![Entitlement {
                app_id: "cards".into()
            }]
        );
    }

    #[tokio::test]
    async fn test_missing_file_is_a_catalog_error() {
        let dir = TempDir::new().unwrap();
        let source = JsonCatalog::new(dir.path().join("nope.json"), dir.path().join("nope.json"));
        assert!(matches!(
            source.fetch_catalog().await,
            Err(InstallError::Catalog(_))
        ));
    }
}
