//! Resource info delivered by the host during initialization

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::{PluginError, PluginResult};

/// Credentials and configuration handed to the plugin by the host
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceInfo {
    /// API keys for the language-model provider
    #[serde(default)]
    pub api_keys: Vec<String>,

    /// Optional override for the model endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_endpoint: Option<String>,

    /// Anything else the host sent along
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ResourceInfo {
    /// Parse resource info from a JSON value
    pub fn from_json(value: Value) -> PluginResult<Self> {
        if !value.is_object() {
            return Err(PluginError::malformed("resource info is not a JSON object"));
        }
        Ok(serde_json::from_value(value)?)
    }

    /// The key used for model calls
    pub fn primary_api_key(&self) -> Option<&str> {
        self.api_keys
            .iter()
            .map(|k| k.as_str())
            .find(|k| !k.is_empty())
    }
}

/// Write-once holder for [`ResourceInfo`]
///
/// Empty until the host answers the resource request; read-only afterwards.
#[derive(Debug, Default)]
pub struct ResourceState {
    info: OnceLock<ResourceInfo>,
}

impl ResourceState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the resource info
    ///
    /// Fails if it was already set.
    pub fn set(&self, info: ResourceInfo) -> PluginResult<()> {
        self.info
            .set(info)
            .map_err(|_| PluginError::other("resource info already set"))
    }

    /// Get the resource info, if it has been delivered
    pub fn get(&self) -> Option<&ResourceInfo> {
        self.info.get()
    }

    /// Get the resource info or fail with `ResourceUnavailable`
    pub fn require(&self) -> PluginResult<&ResourceInfo> {
        self.get()
            .ok_or_else(|| PluginError::ResourceUnavailable("resource info".into()))
    }

    pub fn is_available(&self) -> bool {
        self.info.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_resource_info() {
        let info = ResourceInfo::from_json(json!({
            "name": "resource_info",
            "api_keys": ["", "sk-test"],
            "region": "eu"
        }))
        .unwrap();

        assert_eq!(info.api_keys.len(), 2);
        assert_eq!(info.primary_api_key(), Some("sk-test"));
        assert_eq!(info.extra.get("region"), Some(&json!("eu")));
        assert!(info.model_endpoint.is_none());
    }

    #[test]
    fn test_missing_api_keys_defaults_empty() {
        let info = ResourceInfo::from_json(json!({"name": "resource_info"})).unwrap();
        assert!(info.api_keys.is_empty());
        assert!(info.primary_api_key().is_none());
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(ResourceInfo::from_json(json!("nope")).is_err());
    }

    #[test]
    fn test_state_set_once() {
        let state = ResourceState::new();
        assert!(!state.is_available());
        assert!(matches!(
            state.require(),
            Err(PluginError::ResourceUnavailable(_))
        ));

        state.set(ResourceInfo::default()).unwrap();
        assert!(state.is_available());
        assert!(state.set(ResourceInfo::default()).is_err());
    }
}
