use super::{error::InstallError, InstalledPackage, PackageStore, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

const ENTRY_FILE: &str = "index.html";

/// [`PackageStore`] that installs packages from the local filesystem.
///
/// The download URL is a path or a `file://` URL pointing at a package
/// directory (copied recursively) or a single HTML file (installed as the
/// app's `index.html`). Each app lives in `<root>/<app_id>/`.
#[derive(Debug, Clone)]
pub struct FsPackageStore {
    root: PathBuf,
}

impl FsPackageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding `app_id`'s package
    pub fn app_dir(&self, app_id: &str) -> Result<PathBuf> {
        if app_id.is_empty()
            || app_id.contains('/')
            || app_id.contains('\\')
            || app_id.contains("..")
        {
            return Err(InstallError::InvalidAppId(app_id.to_string()));
        }
        Ok(self.root.join(app_id))
    }

    /// Move a validated staging directory over `dest`, restoring the
    /// previous install if the final rename fails
    async fn swap_in(&self, app_id: &str, staging: &Path, dest: &Path) -> Result<()> {
        let backup = self.root.join(format!(".{}.old", app_id));
        let replacing = fs::try_exists(dest).await?;
        if replacing {
            debug!("Replacing existing package for {}", app_id);
            discard(&backup).await;
            fs::rename(dest, &backup).await?;
        }

        if let Err(e) = fs::rename(staging, dest).await {
            if replacing {
                fs::rename(&backup, dest).await?;
            }
            return Err(e.into());
        }

        if replacing {
            discard(&backup).await;
        }
        Ok(())
    }

    fn source_path(download_url: &str) -> PathBuf {
        PathBuf::from(download_url.strip_prefix("file://").unwrap_or(download_url))
    }
}

/// Fresh copy of `source` at `staging`
async fn stage(source: &Path, is_dir: bool, staging: &Path) -> std::io::Result<()> {
    if fs::try_exists(staging).await? {
        fs::remove_dir_all(staging).await?;
    }
    if is_dir {
        copy_dir(source, staging).await
    } else {
        fs::create_dir_all(staging).await?;
        fs::copy(source, staging.join(ENTRY_FILE)).await.map(|_| ())
    }
}

async fn discard(dir: &Path) {
    if let Err(e) = fs::remove_dir_all(dir).await {
        if e.kind() != ErrorKind::NotFound {
            warn!("Failed to clean up {}: {}", dir.display(), e);
        }
    }
}

async fn copy_dir(source: &Path, dest: &Path) -> std::io::Result<()> {
    let mut pending = vec![(source.to_path_buf(), dest.to_path_buf())];
    while let Some((from, to)) = pending.pop() {
        fs::create_dir_all(&to).await?;
        let mut entries = fs::read_dir(&from).await?;
        while let Some(entry) = entries.next_entry().await? {
            let target = to.join(entry.file_name());
            if entry.file_type().await?.is_dir() {
                pending.push((entry.path(), target));
            } else {
                fs::copy(entry.path(), target).await?;
            }
        }
    }
    Ok(())
}

#[async_trait]
impl PackageStore for FsPackageStore {
    async fn download_package(&self, app_id: &str, download_url: &str) -> Result<InstalledPackage> {
        let dest = self.app_dir(app_id)?;
        let source = Self::source_path(download_url);
        let failed = |reason: String| InstallError::Download {
            app_id: app_id.to_string(),
            reason,
        };

        let metadata = fs::metadata(&source)
            .await
            .map_err(|e| failed(format!("{}: {}", source.display(), e)))?;

        // The live install is only touched once the staged copy has an entry file
        let staging = self.root.join(format!(".{}.tmp", app_id));
        if let Err(e) = stage(&source, metadata.is_dir(), &staging).await {
            discard(&staging).await;
            return Err(e.into());
        }
        if !fs::try_exists(staging.join(ENTRY_FILE)).await? {
            discard(&staging).await;
            return Err(failed(format!("package has no {}", ENTRY_FILE)));
        }

        if let Err(e) = self.swap_in(app_id, &staging, &dest).await {
            discard(&staging).await;
            return Err(e);
        }

        let entry = dest.join(ENTRY_FILE);
        let entry = fs::canonicalize(&entry).await?;
        info!("Installed package for {} at {}", app_id, dest.display());
        Ok(InstalledPackage::new(format!("file://{}", entry.display())))
    }

    async fn remove_package(&self, app_id: &str) -> Result<()> {
        let dir = self.app_dir(app_id)?;
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {
                info!("Removed package for {}", app_id);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No package on disk for {}", app_id);
                Ok(())
            }
            Err(e) => Err(InstallError::Remove {
                app_id: app_id.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}
