//! Credentials for language-model calls
//!
//! Credentials are not known when the client is built: they arrive with the
//! resource info the host delivers during initialization, and are passed to
//! every request.

use crate::core::ResourceInfo;

/// Authentication configuration for API requests
#[derive(Clone)]
pub struct AuthConfig {
    /// API key or token for authentication
    pub api_key: String,
    /// Optional custom base URL (overrides the client's endpoint)
    pub base_url: Option<String>,
}

impl AuthConfig {
    /// Create a new auth config with just an API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
        }
    }

    /// Create a new auth config with API key and custom base URL
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: Some(base_url.into()),
        }
    }

    /// Build credentials from host resource info
    ///
    /// `None` if the host sent no usable key.
    pub fn from_resource(info: &ResourceInfo) -> Option<Self> {
        let api_key = info.primary_api_key()?;
        Some(Self {
            api_key: api_key.to_string(),
            base_url: info.model_endpoint.clone(),
        })
    }
}

// Keys never show up in logs
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}
