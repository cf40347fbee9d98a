//! Outbound host contract

use std::sync::Arc;

use crate::core::{ChannelId, InvokeCommand, Payload, PluginResult, StopStreamCommand};

/// Callback invoked whenever a payload arrives on a registered channel
pub type PayloadCallback = Arc<dyn Fn(Payload) + Send + Sync>;

/// Wrap a closure as a [`PayloadCallback`]
///
/// # Example
///
/// ```ignore
/// host.register_callback(channel_id, callback(move |payload| {
///     tracing::info!("got {}", payload.data);
/// }));
/// ```
pub fn callback<F>(func: F) -> PayloadCallback
where
    F: Fn(Payload) + Send + Sync + 'static,
{
    Arc::new(func)
}

/// Functions the host exposes to a plugin
///
/// Implementations must not block: every method is called from inside
/// handlers and payload callbacks.
pub trait HostInterface: Send + Sync {
    /// Queue a payload for delivery to its receiver channel
    fn send_payload(&self, payload: Payload) -> PluginResult<()>;

    /// Allocate a fresh channel id
    fn new_channel_id(&self) -> ChannelId;

    /// Bind a callback to a channel
    ///
    /// Replaces any callback already bound to the channel.
    fn register_callback(&self, channel_id: ChannelId, callback: PayloadCallback);

    /// Issue a command to the host or another plugin
    fn invoke(&self, command: InvokeCommand) -> PluginResult<()>;

    /// Issue a command and bind `callback` to its sender channel for the reply
    fn invoke_with_callback(
        &self,
        command: InvokeCommand,
        callback: PayloadCallback,
    ) -> PluginResult<()>;

    /// Ask the receiver of a stream to stop it
    fn stop_stream(&self, command: StopStreamCommand) -> PluginResult<()>;

    /// Report completion of deferred initialization
    fn on_initialized(&self, success: bool);
}
