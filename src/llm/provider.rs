//! Chat model trait
//!
//! Abstracts the language-model call so the chat handler does not depend on
//! a particular provider, and tests can plug in a canned model.

use anyhow::Result;

use super::auth::AuthConfig;

/// A model that answers a single prompt with text
#[async_trait::async_trait]
pub trait ChatModel: Send + Sync {
    /// Send `prompt` and return the reply text
    async fn complete(&self, auth: &AuthConfig, prompt: &str) -> Result<String>;

    /// Get the current model name
    fn model(&self) -> String;

    /// Get the provider name (e.g., "anthropic")
    fn provider_name(&self) -> &str;
}
