//! Plugin Configuration
//!
//! Configuration options for the RelayAgent.

use std::path::PathBuf;

use crate::cancellation::COMPUTE_CHUNK_SIZE;
use crate::host::local::DEFAULT_PLUGIN_NAME;

/// Default number of work items for `compute`
pub const DEFAULT_COMPUTE_ITERATIONS: u64 = 100_000_000;

/// Default model for chat replies
pub const DEFAULT_MODEL: &str = "claude-haiku-4-5";

/// Default response size for chat replies
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

pub const ENV_DB_PATH: &str = "RELAY_AGENT_DB_PATH";
pub const ENV_MODEL: &str = "RELAY_AGENT_MODEL";
pub const ENV_MODEL_BASE_URL: &str = "RELAY_AGENT_MODEL_BASE_URL";
pub const ENV_COMPUTE_ITERATIONS: &str = "RELAY_AGENT_COMPUTE_ITERATIONS";

/// Language-model settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    /// Model id sent with every request
    pub model: String,

    /// Maximum tokens per reply
    pub max_tokens: u32,

    /// API base URL, `None` for the provider default
    pub base_url: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            base_url: None,
        }
    }
}

impl ModelConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

/// Configuration for a RelayAgent
///
/// Use the builder pattern to configure the plugin:
///
/// ```ignore
/// let config = PluginConfig::new()
///     .with_db_path("data/relay.db")
///     .with_compute_iterations(1_000_000)
///     .with_model(ModelConfig::new("claude-haiku-4-5"));
/// ```
#[derive(Debug, Clone)]
pub struct PluginConfig {
    /// Name the host routes commands by
    pub plugin_name: String,

    /// SQLite file, `None` keeps the store in memory
    pub db_path: Option<PathBuf>,

    /// Work items a `compute` runs when the command does not say
    pub compute_iterations: u64,

    /// Work items between two cancellation checks
    pub compute_chunk_size: u64,

    /// Language-model settings (chat replies are off without them)
    pub model: Option<ModelConfig>,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            plugin_name: DEFAULT_PLUGIN_NAME.to_string(),
            db_path: None,
            compute_iterations: DEFAULT_COMPUTE_ITERATIONS,
            compute_chunk_size: COMPUTE_CHUNK_SIZE,
            model: None,
        }
    }
}

impl PluginConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from `RELAY_AGENT_*` environment variables
    ///
    /// Unset or unparsable variables keep their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup(ENV_DB_PATH).filter(|p| !p.is_empty()) {
            config.db_path = Some(PathBuf::from(path));
        }

        if let Some(raw) = lookup(ENV_COMPUTE_ITERATIONS) {
            match raw.parse() {
                Ok(n) => config.compute_iterations = n,
                Err(_) => tracing::warn!(
                    "[Config] Ignoring {}={:?}, not a number",
                    ENV_COMPUTE_ITERATIONS,
                    raw
                ),
            }
        }

        if let Some(model) = lookup(ENV_MODEL).filter(|m| !m.is_empty()) {
            let mut model = ModelConfig::new(model);
            if let Some(url) = lookup(ENV_MODEL_BASE_URL).filter(|u| !u.is_empty()) {
                model = model.with_base_url(url);
            }
            config.model = Some(model);
        }

        config
    }

    /// Set the plugin name
    pub fn with_plugin_name(mut self, name: impl Into<String>) -> Self {
        self.plugin_name = name.into();
        self
    }

    /// Persist state to a SQLite file
    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = Some(path.into());
        self
    }

    /// Set the default `compute` size
    pub fn with_compute_iterations(mut self, iterations: u64) -> Self {
        self.compute_iterations = iterations;
        self
    }

    /// Set how often `compute` checks for interrupts
    pub fn with_compute_chunk_size(mut self, chunk_size: u64) -> Self {
        self.compute_chunk_size = chunk_size;
        self
    }

    /// Enable model replies for chat input
    pub fn with_model(mut self, model: ModelConfig) -> Self {
        self.model = Some(model);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = PluginConfig::default();
        assert_eq!(config.plugin_name, DEFAULT_PLUGIN_NAME);
        assert_eq!(config.compute_iterations, 100_000_000);
        assert_eq!(config.compute_chunk_size, 100_000);
        assert!(config.db_path.is_none());
        assert!(config.model.is_none());
    }

    #[test]
    fn test_from_env_values() {
        let config = PluginConfig::from_lookup(lookup(&[
            (ENV_DB_PATH, "/tmp/relay.db"),
            (ENV_COMPUTE_ITERATIONS, "500"),
            (ENV_MODEL, "claude-test"),
            (ENV_MODEL_BASE_URL, "http://localhost:9000"),
        ]));

        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/relay.db")));
        assert_eq!(config.compute_iterations, 500);
        let model = config.model.unwrap();
        assert_eq!(model.model, "claude-test");
        assert_eq!(model.base_url.as_deref(), Some("http://localhost:9000"));
    }

    #[test]
    fn test_from_env_bad_number_keeps_default() {
        let config = PluginConfig::from_lookup(lookup(&[(ENV_COMPUTE_ITERATIONS, "lots")]));
        assert_eq!(config.compute_iterations, DEFAULT_COMPUTE_ITERATIONS);
    }

    #[test]
    fn test_base_url_without_model_is_ignored() {
        let config = PluginConfig::from_lookup(lookup(&[(ENV_MODEL_BASE_URL, "http://x")]));
        assert!(config.model.is_none());
    }

    #[test]
    fn test_builder() {
        let config = PluginConfig::new()
            .with_plugin_name("other")
            .with_db_path("a.db")
            .with_compute_chunk_size(10)
            .with_model(ModelConfig::new("m").with_max_tokens(64));

        assert_eq!(config.plugin_name, "other");
        assert_eq!(config.compute_chunk_size, 10);
        assert_eq!(config.model.unwrap().max_tokens, 64);
    }
}
