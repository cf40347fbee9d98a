//! LocalHost - In-process implementation of the host side of the plugin ABI
//!
//! The `LocalHost` is responsible for:
//! - Allocating channel ids
//! - Holding the channel -> callback table
//! - Running a sequential message loop over invokes, stop-stream requests
//!   and payloads, so messages on one channel are handled in arrival order
//! - Serving commands addressed to the host (`get_resource_info`)
//! - Collecting payloads nobody registered a callback for (the outbox)
//!
//! A `FINAL` payload consumes the callback it is delivered to.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use crate::core::{
    ChannelId, Command, InvokeCommand, Payload, PayloadData, PluginError, PluginResult,
    StopStreamCommand,
};
use crate::plugin::AgentPlugin;

use super::interface::{HostInterface, PayloadCallback};
use super::HOST_TARGET;

/// Default buffer size for the output broadcast channel
pub const OUTPUT_CHANNEL_SIZE: usize = 256;

/// Default plugin name payloads and commands are routed to
pub const DEFAULT_PLUGIN_NAME: &str = "relay_agent";

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for a [`LocalHost`]
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// First channel id handed out by `new_channel_id`
    pub first_channel_id: ChannelId,

    /// Name of the plugin attached to this host
    pub plugin_name: String,

    /// Body returned for `get_resource_info`
    pub resource_info: Value,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            first_channel_id: 0,
            plugin_name: DEFAULT_PLUGIN_NAME.to_string(),
            resource_info: json!({ "name": "resource_info", "api_keys": [] }),
        }
    }
}

impl HostConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the first channel id to allocate
    pub fn with_first_channel_id(mut self, id: ChannelId) -> Self {
        self.first_channel_id = id;
        self
    }

    /// Set the attached plugin's name
    pub fn with_plugin_name(mut self, name: impl Into<String>) -> Self {
        self.plugin_name = name.into();
        self
    }

    /// Set the resource info served to the plugin
    pub fn with_resource_info(mut self, info: Value) -> Self {
        self.resource_info = info;
        self
    }
}

// ============================================================================
// LocalHost
// ============================================================================

/// Messages processed by the host loop
#[derive(Debug, Clone)]
pub enum HostMessage {
    /// Command for the plugin or the host
    Invoke(InvokeCommand),
    /// Stream termination for the plugin
    StopStream(StopStreamCommand),
    /// Payload to route to a callback or the outbox
    Payload(Payload),
    /// Stop the loop
    Shutdown,
}

struct HostInner {
    config: HostConfig,
    next_channel_id: AtomicI64,
    callbacks: Mutex<HashMap<ChannelId, PayloadCallback>>,
    queue_tx: mpsc::UnboundedSender<HostMessage>,
    queue_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<HostMessage>>,
    outbox: Mutex<Vec<Payload>>,
    output_tx: broadcast::Sender<Payload>,
    initialized_tx: watch::Sender<Option<bool>>,
}

/// In-process host
///
/// Cheap to clone; all clones share the same queue and tables.
///
/// # Example
///
/// ```ignore
/// let host = LocalHost::new(HostConfig::default());
/// let agent = Arc::new(RelayAgent::new(PluginConfig::default()));
/// agent.initialize(Arc::new(host.clone())).await;
///
/// let loop_handle = host.run(agent.clone());
/// host.invoke_plugin(5, &json!({"name": "chat_out"}))?;
/// ```
#[derive(Clone)]
pub struct LocalHost {
    inner: Arc<HostInner>,
}

impl LocalHost {
    /// Create a new host
    pub fn new(config: HostConfig) -> Self {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let (output_tx, _) = broadcast::channel(OUTPUT_CHANNEL_SIZE);
        let (initialized_tx, _) = watch::channel(None);

        Self {
            inner: Arc::new(HostInner {
                next_channel_id: AtomicI64::new(config.first_channel_id),
                config,
                callbacks: Mutex::new(HashMap::new()),
                queue_tx,
                queue_rx: tokio::sync::Mutex::new(queue_rx),
                outbox: Mutex::new(Vec::new()),
                output_tx,
                initialized_tx,
            }),
        }
    }

    /// Get the host configuration
    pub fn config(&self) -> &HostConfig {
        &self.inner.config
    }

    // =========================================================================
    // Host-side injection
    // =========================================================================

    /// Queue a command for the attached plugin
    pub fn invoke_plugin(&self, sender_channel_id: ChannelId, body: &Value) -> PluginResult<()> {
        let command = InvokeCommand::new(sender_channel_id, &self.inner.config.plugin_name, body);
        self.enqueue(HostMessage::Invoke(command))
    }

    /// Queue a command with an auxiliary bundle for the attached plugin
    pub fn invoke_plugin_with_aux(
        &self,
        sender_channel_id: ChannelId,
        body: &Value,
        aux: Value,
    ) -> PluginResult<()> {
        let command = InvokeCommand::new(sender_channel_id, &self.inner.config.plugin_name, body)
            .with_aux(aux);
        self.enqueue(HostMessage::Invoke(command))
    }

    /// Tell the plugin that the stream on `channel_id` ended
    pub fn end_stream(&self, channel_id: ChannelId) -> PluginResult<()> {
        self.enqueue(HostMessage::StopStream(StopStreamCommand {
            stream_channel_id: channel_id,
            to: self.inner.config.plugin_name.clone(),
        }))
    }

    /// Stop the message loop after the messages already queued
    pub fn shutdown(&self) -> PluginResult<()> {
        self.enqueue(HostMessage::Shutdown)
    }

    fn enqueue(&self, message: HostMessage) -> PluginResult<()> {
        self.inner
            .queue_tx
            .send(message)
            .map_err(|_| PluginError::ChannelClosed)
    }

    // =========================================================================
    // Observation
    // =========================================================================

    /// Subscribe to payloads that reached no callback
    pub fn subscribe_output(&self) -> broadcast::Receiver<Payload> {
        self.inner.output_tx.subscribe()
    }

    /// Take every payload collected in the outbox so far
    pub fn take_outbox(&self) -> Vec<Payload> {
        let mut outbox = self.inner.outbox.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *outbox)
    }

    /// Check whether a callback is bound to a channel
    pub fn has_callback(&self, channel_id: ChannelId) -> bool {
        self.callbacks().contains_key(&channel_id)
    }

    /// Result reported through `on_initialized`, if any
    pub fn initialized(&self) -> Option<bool> {
        *self.inner.initialized_tx.borrow()
    }

    /// Wait until the plugin reports initialization
    pub async fn wait_initialized(&self) -> bool {
        let mut rx = self.inner.initialized_tx.subscribe();
        loop {
            if let Some(success) = *rx.borrow_and_update() {
                return success;
            }
            if rx.changed().await.is_err() {
                return false;
            }
        }
    }

    fn callbacks(&self) -> std::sync::MutexGuard<'_, HashMap<ChannelId, PayloadCallback>> {
        self.inner.callbacks.lock().unwrap_or_else(|e| e.into_inner())
    }

    // =========================================================================
    // Message loop
    // =========================================================================

    /// Spawn the message loop for `plugin`
    ///
    /// The loop ends on [`LocalHost::shutdown`].
    pub fn run(&self, plugin: Arc<dyn AgentPlugin>) -> JoinHandle<()> {
        let host = self.clone();
        tokio::spawn(async move {
            let mut queue = host.inner.queue_rx.lock().await;
            tracing::info!("[LocalHost] Message loop started");

            while let Some(message) = queue.recv().await {
                if !host.process_message(plugin.as_ref(), message).await {
                    break;
                }
            }

            tracing::info!("[LocalHost] Message loop stopped");
        })
    }

    /// Process every queued message, including ones queued while processing
    ///
    /// Returns the number of messages processed. A `Shutdown` message stops
    /// the drain early.
    pub async fn process_pending(&self, plugin: &dyn AgentPlugin) -> usize {
        let mut queue = self.inner.queue_rx.lock().await;
        let mut processed = 0;

        while let Ok(message) = queue.try_recv() {
            processed += 1;
            if !self.process_message(plugin, message).await {
                break;
            }
        }

        processed
    }

    async fn process_message(&self, plugin: &dyn AgentPlugin, message: HostMessage) -> bool {
        match message {
            HostMessage::Invoke(command) if command.to == HOST_TARGET => {
                self.handle_host_command(command);
            }
            HostMessage::Invoke(command) => {
                if command.to != self.inner.config.plugin_name {
                    tracing::warn!("[LocalHost] No plugin named '{}'", command.to);
                    return true;
                }
                plugin
                    .invoke(command.sender_channel_id, command.data, command.aux)
                    .await;
            }
            HostMessage::StopStream(command) => {
                plugin.stop_stream(command.stream_channel_id);
            }
            HostMessage::Payload(payload) => {
                self.route_payload(payload);
            }
            HostMessage::Shutdown => return false,
        }
        true
    }

    fn route_payload(&self, payload: Payload) {
        let channel_id = payload.receiver_channel_id;

        let callback = {
            let mut callbacks = self.callbacks();
            if payload.is_final() {
                callbacks.remove(&channel_id)
            } else {
                callbacks.get(&channel_id).cloned()
            }
        };

        match callback {
            Some(callback) => callback(payload),
            None => {
                tracing::debug!(channel_id, "[LocalHost] Payload reached outbox");
                self.inner
                    .outbox
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .push(payload.clone());
                // No subscribers is fine
                let _ = self.inner.output_tx.send(payload);
            }
        }
    }

    fn handle_host_command(&self, command: InvokeCommand) {
        let decoded = match Command::decode(&command.data) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::warn!("[LocalHost] Failed to parse host command: {}", e);
                return;
            }
        };

        match decoded.name.as_str() {
            "get_resource_info" => {
                let reply = Payload::final_(
                    command.sender_channel_id,
                    PayloadData::Json(self.inner.config.resource_info.clone()),
                );
                if let Err(e) = self.send_payload(reply) {
                    tracing::error!("[LocalHost] Failed to answer resource request: {}", e);
                }
            }
            other => {
                tracing::warn!("[LocalHost] Host does not have invokable {}", other);
            }
        }
    }
}

impl HostInterface for LocalHost {
    fn send_payload(&self, payload: Payload) -> PluginResult<()> {
        self.enqueue(HostMessage::Payload(payload))
    }

    fn new_channel_id(&self) -> ChannelId {
        self.inner.next_channel_id.fetch_add(1, Ordering::SeqCst)
    }

    fn register_callback(&self, channel_id: ChannelId, callback: PayloadCallback) {
        self.callbacks().insert(channel_id, callback);
    }

    fn invoke(&self, command: InvokeCommand) -> PluginResult<()> {
        self.enqueue(HostMessage::Invoke(command))
    }

    fn invoke_with_callback(
        &self,
        command: InvokeCommand,
        callback: PayloadCallback,
    ) -> PluginResult<()> {
        self.register_callback(command.sender_channel_id, callback);
        self.invoke(command)
    }

    fn stop_stream(&self, command: StopStreamCommand) -> PluginResult<()> {
        self.enqueue(HostMessage::StopStream(command))
    }

    fn on_initialized(&self, success: bool) {
        tracing::info!("[LocalHost] Plugin initialized: {}", success);
        self.inner.initialized_tx.send_replace(Some(success));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::callback;
    use async_trait::async_trait;
    use crate::core::Aux;
    use crate::plugin::InitializeStatus;

    /// Plugin that records what the host delivered to it
    #[derive(Default)]
    struct RecordingPlugin {
        invokes: Mutex<Vec<(ChannelId, String)>>,
        stopped: Mutex<Vec<ChannelId>>,
    }

    #[async_trait]
    impl AgentPlugin for RecordingPlugin {
        fn plugin_info(&self) -> String {
            "recording".into()
        }

        async fn initialize(&self, _host: Arc<dyn HostInterface>) -> InitializeStatus {
            InitializeStatus::Success
        }

        async fn uninitialize(&self) {}

        async fn invoke(&self, channel_id: ChannelId, data: String, _aux: Aux) {
            self.invokes.lock().unwrap().push((channel_id, data));
        }

        fn stop_stream(&self, channel_id: ChannelId) {
            self.stopped.lock().unwrap().push(channel_id);
        }
    }

    #[test]
    fn test_channel_ids_are_unique() {
        let host = LocalHost::new(HostConfig::default().with_first_channel_id(40));
        assert_eq!(host.new_channel_id(), 40);
        assert_eq!(host.new_channel_id(), 41);
        assert_eq!(host.clone().new_channel_id(), 42);
    }

    #[tokio::test]
    async fn test_invokes_reach_plugin_in_order() {
        let host = LocalHost::new(HostConfig::default());
        let plugin = RecordingPlugin::default();

        host.invoke_plugin(1, &json!({"name": "a"})).unwrap();
        host.invoke_plugin(1, &json!({"name": "b"})).unwrap();
        host.end_stream(1).unwrap();

        assert_eq!(host.process_pending(&plugin).await, 3);

        let invokes = plugin.invokes.lock().unwrap();
        assert_eq!(invokes.len(), 2);
        assert!(invokes[0].1.contains("\"a\""));
        assert!(invokes[1].1.contains("\"b\""));
        assert_eq!(*plugin.stopped.lock().unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_unknown_plugin_is_dropped() {
        let host = LocalHost::new(HostConfig::default());
        let plugin = RecordingPlugin::default();

        let command = InvokeCommand::new(1, "someone_else", &json!({"name": "a"}));
        host.invoke(command).unwrap();
        host.process_pending(&plugin).await;

        assert!(plugin.invokes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_payload_without_callback_goes_to_outbox() {
        let host = LocalHost::new(HostConfig::default());
        let plugin = RecordingPlugin::default();
        let mut rx = host.subscribe_output();

        host.send_payload(Payload::new(9, "hi")).unwrap();
        host.process_pending(&plugin).await;

        let outbox = host.take_outbox();
        assert_eq!(outbox, vec![Payload::new(9, "hi")]);
        assert_eq!(rx.try_recv().unwrap(), Payload::new(9, "hi"));
        assert!(host.take_outbox().is_empty());
    }

    #[tokio::test]
    async fn test_final_payload_consumes_callback() {
        let host = LocalHost::new(HostConfig::default());
        let plugin = RecordingPlugin::default();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_cb = seen.clone();
        host.register_callback(
            3,
            callback(move |payload| seen_cb.lock().unwrap().push(payload)),
        );

        host.send_payload(Payload::new(3, "one")).unwrap();
        host.send_payload(Payload::final_(3, "two")).unwrap();
        host.send_payload(Payload::new(3, "three")).unwrap();
        host.process_pending(&plugin).await;

        assert_eq!(seen.lock().unwrap().len(), 2);
        assert!(!host.has_callback(3));
        assert_eq!(host.take_outbox(), vec![Payload::new(3, "three")]);
    }

    #[tokio::test]
    async fn test_host_serves_resource_info() {
        let info = json!({"name": "resource_info", "api_keys": ["k"]});
        let host = LocalHost::new(HostConfig::default().with_resource_info(info.clone()));
        let plugin = RecordingPlugin::default();
        let seen = Arc::new(Mutex::new(None));

        let seen_cb = seen.clone();
        let command = InvokeCommand::new(7, HOST_TARGET, &json!({"name": "get_resource_info"}));
        host.invoke_with_callback(
            command,
            callback(move |payload| *seen_cb.lock().unwrap() = Some(payload)),
        )
        .unwrap();
        host.process_pending(&plugin).await;

        let reply = seen.lock().unwrap().clone().unwrap();
        assert!(reply.is_final());
        assert_eq!(reply.data, PayloadData::Json(info));
        assert!(plugin.invokes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_stops_run_loop() {
        let host = LocalHost::new(HostConfig::default());
        let plugin: Arc<dyn AgentPlugin> = Arc::new(RecordingPlugin::default());

        let handle = host.run(plugin);
        host.shutdown().unwrap();

        tokio::time::timeout(std::time::Duration::from_secs(1), handle)
            .await
            .expect("loop did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_on_initialized_is_observable() {
        let host = LocalHost::new(HostConfig::default());
        assert_eq!(host.initialized(), None);

        host.on_initialized(true);
        assert_eq!(host.initialized(), Some(true));
        assert!(host.wait_initialized().await);
    }
}
