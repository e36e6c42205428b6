use crate::registry::AppRegistry;
use serde_json::Value;

/// Config key holding the list of topics an app may call
pub const ALLOWED_BRIDGE_METHODS_CONFIG_KEY: &str = "allowedFunctions";

/// Topics a guest app is allowed to dispatch.
///
/// Resolution fails closed: a missing app, missing configs, a missing key, a
/// value that is not a list or an empty list all deny every topic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    topics: Vec<String>,
}

impl AllowList {
    pub fn deny_all() -> Self {
        Self::default()
    }

    pub fn from_topics<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            topics: topics.into_iter().map(Into::into).collect(),
        }
    }

    /// Resolve the allow-list of `app_id` under the default config key
    pub fn resolve(registry: &AppRegistry, app_id: &str) -> Self {
        Self::resolve_with_key(registry, app_id, ALLOWED_BRIDGE_METHODS_CONFIG_KEY)
    }

    pub fn resolve_with_key(registry: &AppRegistry, app_id: &str, key: &str) -> Self {
        registry
            .read_app(app_id, |app| app.config(key).map(Self::from_config_value))
            .flatten()
            .unwrap_or_default()
    }

    /// Non-string entries are ignored; anything but a list denies everything
    pub fn from_config_value(value: &Value) -> Self {
        match value {
            Value::Array(items) => Self {
                topics: items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect(),
            },
            _ => Self::deny_all(),
        }
    }

    pub fn is_allowed(&self, topic: &str) -> bool {
        !self.topics.is_empty() && self.topics.iter().any(|allowed| allowed == topic)
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }
}
