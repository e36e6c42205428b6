use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Display mode applied when an app does not declare one
pub const DEFAULT_DISPLAY_MODE: &str = "default";

/// Local install state of a micro-app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppStatus {
    Downloaded,
    NotDownloaded,
}

/// A published build of a micro-app
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    pub version: String,
    #[serde(default)]
    pub build: i64,
    #[serde(default)]
    pub release_notes: String,
    pub download_url: String,
    #[serde(default)]
    pub icon_url: String,
}

impl Version {
    pub fn new(version: impl Into<String>, download_url: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            build: 0,
            release_notes: String::new(),
            download_url: download_url.into(),
            icon_url: String::new(),
        }
    }
}

/// A key/value configuration entry attached to a micro-app
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MicroAppConfig {
    #[serde(default)]
    pub micro_app_id: String,
    pub config_key: String,
    #[serde(default)]
    pub config_value: Value,
    #[serde(default = "active")]
    pub is_active: u8,
}

fn active() -> u8 {
    1
}

/// Registry entry for one installable guest application.
///
/// Metadata comes from the remote catalog. The session fields (`status`,
/// `web_view_uri`, `client_id`, `exchanged_token`, `display_mode`) are only
/// set once the app has been loaded on this device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MicroApp {
    pub app_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub promo_text: String,
    #[serde(default)]
    pub icon_url: String,
    #[serde(default)]
    pub banner_image_url: String,
    #[serde(default)]
    pub is_mandatory: u8,
    /// Ordered newest first
    #[serde(default)]
    pub versions: Vec<Version>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub configs: Vec<MicroAppConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AppStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_view_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchanged_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_mode: Option<String>,
}

impl MicroApp {
    /// Create a catalog entry with no versions or configs
    pub fn new(app_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            name: name.into(),
            description: String::new(),
            promo_text: String::new(),
            icon_url: String::new(),
            banner_image_url: String::new(),
            is_mandatory: 0,
            versions: Vec::new(),
            configs: Vec::new(),
            status: None,
            web_view_uri: None,
            client_id: None,
            exchanged_token: None,
            display_mode: None,
        }
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.versions.push(version);
        self
    }

    pub fn with_config(mut self, key: impl Into<String>, value: Value) -> Self {
        self.configs.push(MicroAppConfig {
            micro_app_id: self.app_id.clone(),
            config_key: key.into(),
            config_value: value,
            is_active: 1,
        });
        self
    }

    pub fn mandatory(mut self) -> Self {
        self.is_mandatory = 1;
        self
    }

    /// The first listed version is the latest one
    pub fn latest_version(&self) -> Option<&Version> {
        self.versions.first()
    }

    pub fn is_mandatory(&self) -> bool {
        self.is_mandatory != 0
    }

    pub fn is_downloaded(&self) -> bool {
        self.status == Some(AppStatus::Downloaded)
    }

    /// Look up a configuration value by key
    pub fn config(&self, key: &str) -> Option<&Value> {
        self.configs
            .iter()
            .find(|config| config.config_key == key)
            .map(|config| &config.config_value)
    }

    /// Name used in progress labels and alerts
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.app_id
        } else {
            &self.name
        }
    }

    /// Copy catalog metadata from `other`, keeping this entry's session fields
    pub(crate) fn merge_metadata(&mut self, other: MicroApp) {
        self.name = other.name;
        self.description = other.description;
        self.promo_text = other.promo_text;
        self.icon_url = other.icon_url;
        self.banner_image_url = other.banner_image_url;
        self.is_mandatory = other.is_mandatory;
        self.versions = other.versions;
        self.configs = other.configs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_catalog_entry() {
        let raw = json!({
            "appId": "payslip",
            "name": "Payslip",
            "description": "Monthly payslips",
            "promoText": "",
            "iconUrl": "https://cdn/icon.png",
            "bannerImageUrl": "https://cdn/banner.png",
            "isMandatory": 1,
            "versions": [
                { "version": "1.2.0", "build": 12, "releaseNotes": "", "downloadUrl": "https://cdn/1.2.0.zip", "iconUrl": "" },
                { "version": "1.1.0", "build": 11, "releaseNotes": "", "downloadUrl": "https://cdn/1.1.0.zip", "iconUrl": "" }
            ],
            "configs": [
                { "microAppId": "payslip", "configKey": "allowedFunctions", "configValue": ["token"], "isActive": 1 }
            ]
        });

        let app: MicroApp = serde_json::from_value(raw).unwrap();
        assert!(app.is_mandatory());
        assert_eq!(app.latest_version().unwrap().build, 12);
        assert_eq!(app.config("allowedFunctions"), Some(&json!(["token"])));
        assert!(app.status.is_none());
        assert!(!app.is_downloaded());
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_value(AppStatus::NotDownloaded).unwrap(),
            json!("not-downloaded")
        );
        let status: AppStatus = serde_json::from_value(json!("downloaded")).unwrap();
        assert_eq!(status, AppStatus::Downloaded);
    }

    #[test]
    fn test_merge_metadata_keeps_session_fields() {
        let mut local = MicroApp::new("news", "News");
        local.status = Some(AppStatus::Downloaded);
        local.web_view_uri = Some("file:///apps/news/index.html".into());

        let remote = MicroApp::new("news", "Company News").with_version(Version::new("2.0.0", "u"));
        local.merge_metadata(remote);

        assert_eq!(local.name, "Company News");
        assert_eq!(local.versions.len(), 1);
        assert!(local.is_downloaded());
        assert!(local.web_view_uri.is_some());
    }
}
