//! Language-model access for chat replies

pub mod anthropic;
pub mod auth;
pub mod provider;

pub use anthropic::AnthropicClient;
pub use auth::AuthConfig;
pub use provider::ChatModel;
