//! Shared state handed to every handler

use std::sync::Arc;

use uuid::Uuid;

use crate::cancellation::CancellationRegistry;
use crate::config::PluginConfig;
use crate::core::{Payload, ResourceState};
use crate::host::HostInterface;
use crate::llm::{AuthConfig, ChatModel};
use crate::store::DataStore;
use crate::streaming::StreamSessions;

/// Everything a handler can reach through the `context` parameter
///
/// Built in `initialize` and dropped in `uninitialize`. Callbacks that
/// outlive a dispatch hold it weakly.
pub struct PluginContext {
    instance_id: Uuid,
    host: Arc<dyn HostInterface>,
    config: PluginConfig,
    cancellation: Arc<CancellationRegistry>,
    streams: StreamSessions,
    resources: ResourceState,
    store: Option<DataStore>,
    model: Option<Arc<dyn ChatModel>>,
}

impl PluginContext {
    pub fn new(host: Arc<dyn HostInterface>, config: PluginConfig) -> Self {
        Self {
            instance_id: Uuid::new_v4(),
            host,
            config,
            cancellation: Arc::new(CancellationRegistry::new()),
            streams: StreamSessions::new(),
            resources: ResourceState::new(),
            store: None,
            model: None,
        }
    }

    /// Attach the persistent store
    pub fn with_store(mut self, store: DataStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Attach a model for chat replies
    pub fn with_model(mut self, model: Option<Arc<dyn ChatModel>>) -> Self {
        self.model = model;
        self
    }

    /// Unique id of this context, for logs
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn host(&self) -> &dyn HostInterface {
        self.host.as_ref()
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    pub fn cancellation(&self) -> &Arc<CancellationRegistry> {
        &self.cancellation
    }

    pub fn streams(&self) -> &StreamSessions {
        &self.streams
    }

    pub fn resources(&self) -> &ResourceState {
        &self.resources
    }

    pub fn store(&self) -> Option<&DataStore> {
        self.store.as_ref()
    }

    pub fn model(&self) -> Option<&Arc<dyn ChatModel>> {
        self.model.as_ref()
    }

    /// Credentials for model calls, once resource info has arrived
    pub fn auth(&self) -> Option<AuthConfig> {
        self.resources.get().and_then(AuthConfig::from_resource)
    }

    /// Send a payload, logging instead of failing
    pub fn send_or_log(&self, payload: Payload) {
        let channel_id = payload.receiver_channel_id;
        if let Err(e) = self.host.send_payload(payload) {
            tracing::warn!(channel_id, "[PluginContext] Failed to send payload: {}", e);
        }
    }
}
