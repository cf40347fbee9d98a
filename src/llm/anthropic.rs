//! Anthropic Messages API client
//!
//! Sends a single user turn and returns the text of the reply. Credentials
//! are passed per call (see [`AuthConfig`]).

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::ModelConfig;

use super::auth::AuthConfig;
use super::provider::ChatModel;

/// Default API base URL
pub const DEFAULT_API_BASE: &str = "https://api.anthropic.com";

/// API version header value
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<RequestMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

impl MessagesResponse {
    fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ResponseBlock::Text { text } => Some(text.as_str()),
                ResponseBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

/// Anthropic chat model
pub struct AnthropicClient {
    client: Client,
    model: String,
    max_tokens: u32,
    api_base: String,
}

impl AnthropicClient {
    /// Create a client for `model` against the default endpoint
    pub fn new(model: impl Into<String>) -> Self {
        Self::from_config(&ModelConfig::new(model))
    }

    /// Create a client from model settings
    pub fn from_config(config: &ModelConfig) -> Self {
        Self {
            client: Client::new(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            api_base: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
        }
    }

    /// Set the max tokens for responses
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn messages_url(&self, auth: &AuthConfig) -> String {
        let base = auth.base_url.as_deref().unwrap_or(&self.api_base);
        format!("{}/v1/messages", base.trim_end_matches('/'))
    }

    fn build_request<'a>(&'a self, prompt: &'a str) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![RequestMessage {
                role: "user",
                content: prompt,
            }],
        }
    }
}

#[async_trait::async_trait]
impl ChatModel for AnthropicClient {
    async fn complete(&self, auth: &AuthConfig, prompt: &str) -> Result<String> {
        let url = self.messages_url(auth);
        let request_json = serde_json::to_string(&self.build_request(prompt))
            .context("Failed to serialize Anthropic request")?;

        tracing::debug!("[Anthropic] POST {} ({} chars)", url, prompt.len());

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("x-api-key", &auth.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .body(request_json)
            .send()
            .await
            .context("Failed to send request to Anthropic API")?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .context("Failed to read Anthropic response body")?;

        if !status.is_success() {
            tracing::error!("[Anthropic] API error: {} - {}", status, response_text);
            anyhow::bail!("Anthropic API error ({}): {}", status, response_text);
        }

        let parsed: MessagesResponse = serde_json::from_str(&response_text)
            .context("Failed to parse Anthropic API response")?;

        let text = parsed.text();
        tracing::info!(
            "[Anthropic] Response {} received, {} chars",
            parsed.id,
            text.len()
        );
        Ok(text)
    }

    fn model(&self) -> String {
        self.model.clone()
    }

    fn provider_name(&self) -> &str {
        "anthropic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_shape() {
        let client = AnthropicClient::new("claude-test").with_max_tokens(32);
        let body = serde_json::to_value(client.build_request("hi")).unwrap();

        assert_eq!(
            body,
            json!({
                "model": "claude-test",
                "max_tokens": 32,
                "messages": [{"role": "user", "content": "hi"}]
            })
        );
    }

    #[test]
    fn test_response_text_skips_other_blocks() {
        let parsed: MessagesResponse = serde_json::from_value(json!({
            "id": "msg_1",
            "content": [
                {"type": "thinking", "thinking": "..."},
                {"type": "text", "text": "Hello"},
                {"type": "text", "text": ", world"}
            ]
        }))
        .unwrap();

        assert_eq!(parsed.text(), "Hello, world");
    }

    #[test]
    fn test_url_prefers_auth_base() {
        let client = AnthropicClient::from_config(
            &ModelConfig::new("m").with_base_url("http://config.local/"),
        );

        assert_eq!(
            client.messages_url(&AuthConfig::new("k")),
            "http://config.local/v1/messages"
        );
        assert_eq!(
            client.messages_url(&AuthConfig::with_base_url("k", "http://proxy.local")),
            "http://proxy.local/v1/messages"
        );
    }

    #[test]
    fn test_provider_metadata() {
        let client = AnthropicClient::new("claude-test");
        assert_eq!(client.model(), "claude-test");
        assert_eq!(client.provider_name(), "anthropic");
    }
}
