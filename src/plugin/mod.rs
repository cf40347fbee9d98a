//! Plugin lifecycle
//!
//! - `AgentPlugin` - Inbound contract the host drives
//! - `PluginContext` - Shared state built in `initialize`, dropped in `uninitialize`
//! - `RelayAgent` - The plugin: dispatches commands to the built-in handlers

pub mod agent;
pub mod context;

pub use agent::RelayAgent;
pub use context::PluginContext;

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::{Aux, ChannelId};
use crate::host::HostInterface;

/// Result of `initialize`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitializeStatus {
    Success,
    Error,
}

/// Functions a plugin exposes to the host
///
/// `initialize` must not wait on the host: anything it needs from the host
/// is requested with a callback, and completion is reported through
/// [`HostInterface::on_initialized`].
#[async_trait]
pub trait AgentPlugin: Send + Sync {
    /// Human-readable name and version
    fn plugin_info(&self) -> String;

    async fn initialize(&self, host: Arc<dyn HostInterface>) -> InitializeStatus;

    async fn uninitialize(&self);

    /// Handle a command delivered on `channel_id`
    ///
    /// Never fails; problems are logged.
    async fn invoke(&self, channel_id: ChannelId, data: String, aux: Aux);

    /// The stream on `channel_id` ended
    fn stop_stream(&self, channel_id: ChannelId);

    /// Another plugin was loaded by the host
    fn plugin_added(&self, plugin_info: &str) {
        tracing::debug!("[Plugin] Plugin added: {}", plugin_info);
    }

    /// Another plugin was unloaded by the host
    fn plugin_removed(&self, name: &str) {
        tracing::debug!("[Plugin] Plugin removed: {}", name);
    }
}
