use crate::bridge::DEFAULT_NAMESPACE;
use crate::capability::ALLOWED_BRIDGE_METHODS_CONFIG_KEY;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "SuperApp.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Could not find {0}")]
    NotFound(&'static str),

    #[error("Failed to get current directory: {0}")]
    CurrentDir(std::io::Error),
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct BridgeConfig {
    /// Object on the guest page that receives callbacks
    pub namespace: String,
    /// App config key holding the topic allow-list
    pub allow_list_key: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            allow_list_key: ALLOWED_BRIDGE_METHODS_CONFIG_KEY.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct StorageConfig {
    pub micro_app_dir: PathBuf,
    pub registry_snapshot: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            micro_app_dir: PathBuf::from("data/micro_apps"),
            registry_snapshot: PathBuf::from("data/registry.json"),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct SuperAppConfig {
    pub bridge: BridgeConfig,
    pub storage: StorageConfig,
}

impl SuperAppConfig {
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        let path = config_path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Find `SuperApp.toml` in the current directory or one of its parents
    pub fn from_project_root() -> Result<Self, ConfigError> {
        let current_dir = std::env::current_dir().map_err(ConfigError::CurrentDir)?;
        Self::find_from(current_dir)
    }

    /// Find `SuperApp.toml` in `start` or one of its parents
    pub fn find_from(start: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let mut dir = start.into();
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Self::load(config_path);
            }
            if !dir.pop() {
                break;
            }
        }
        Err(ConfigError::NotFound(CONFIG_FILE_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_config() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join(CONFIG_FILE_NAME);
        fs::write(
            &config_path,
            r#"
[bridge]
namespace = "window.hostbridge"

[storage]
micro_app_dir = "apps"
registry_snapshot = "apps/registry.json"
"#,
        )
        .unwrap();

        let config = SuperAppConfig::load(config_path).unwrap();
        assert_eq!(config.bridge.namespace, "window.hostbridge");
        assert_eq!(config.bridge.allow_list_key, "allowedFunctions");
        assert_eq!(config.storage.micro_app_dir, PathBuf::from("apps"));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: SuperAppConfig = toml::from_str("").unwrap();
        assert_eq!(config, SuperAppConfig::default());
        assert_eq!(config.bridge.namespace, DEFAULT_NAMESPACE);
    }

    #[test]
    fn test_invalid_config() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join(CONFIG_FILE_NAME);
        fs::write(&config_path, "[bridge]\nnamespace = 3\n").unwrap();

        assert!(matches!(
            SuperAppConfig::load(config_path),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_find_from_walks_up() {
        let temp_dir = tempdir().unwrap();
        fs::write(
            temp_dir.path().join(CONFIG_FILE_NAME),
            "[storage]\nmicro_app_dir = \"found\"\n",
        )
        .unwrap();
        let nested = temp_dir.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();

        let config = SuperAppConfig::find_from(&nested).unwrap();
        assert_eq!(config.storage.micro_app_dir, PathBuf::from("found"));
    }
}
