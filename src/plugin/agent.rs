//! RelayAgent - The plugin the host loads
//!
//! Owns the dispatcher (built once from the built-in registry) and the
//! [`PluginContext`] for the current host session. The context exists from
//! `initialize` until `uninitialize`; commands delivered outside that window
//! are dropped.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::config::PluginConfig;
use crate::core::{Aux, ChannelId, PluginError, PluginResult};
use crate::dispatch::{DispatchOutcome, Dispatcher};
use crate::handlers::{builtin_registry, resource};
use crate::host::HostInterface;
use crate::invokable::InvokableRegistry;
use crate::llm::{AnthropicClient, ChatModel};
use crate::store::DataStore;

use super::{AgentPlugin, InitializeStatus, PluginContext};

/// The relay agent plugin
pub struct RelayAgent {
    config: PluginConfig,
    dispatcher: Dispatcher,
    model: Option<Arc<dyn ChatModel>>,
    context: RwLock<Option<Arc<PluginContext>>>,
}

impl RelayAgent {
    /// Create the plugin with the built-in commands
    ///
    /// A model client is created when `config.model` is set.
    pub fn new(config: PluginConfig) -> Self {
        let model = config
            .model
            .as_ref()
            .map(|m| Arc::new(AnthropicClient::from_config(m)) as Arc<dyn ChatModel>);

        Self {
            config,
            dispatcher: Dispatcher::new(Arc::new(builtin_registry())),
            model,
            context: RwLock::new(None),
        }
    }

    /// Replace the command registry
    pub fn with_registry(mut self, registry: InvokableRegistry) -> Self {
        self.dispatcher = Dispatcher::new(Arc::new(registry));
        self
    }

    /// Use `model` for chat replies
    pub fn with_model(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    /// The live context, if initialized
    pub fn context(&self) -> Option<Arc<PluginContext>> {
        self.context
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.context().is_some()
    }

    /// Dispatch a command and report what happened
    ///
    /// Fails only when the plugin is not initialized.
    pub fn dispatch(
        &self,
        channel_id: ChannelId,
        raw: &str,
        aux: Aux,
    ) -> PluginResult<DispatchOutcome> {
        let context = self.context().ok_or(PluginError::NotInitialized)?;
        Ok(self.dispatcher.dispatch(&context, channel_id, raw, aux))
    }

    fn open_store(&self) -> PluginResult<DataStore> {
        match &self.config.db_path {
            Some(path) => DataStore::open(path),
            None => DataStore::open_in_memory(),
        }
    }

    fn set_context(&self, context: Option<Arc<PluginContext>>) -> Option<Arc<PluginContext>> {
        let mut slot = self.context.write().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *slot, context)
    }
}

#[async_trait]
impl AgentPlugin for RelayAgent {
    fn plugin_info(&self) -> String {
        format!("{} v{}", self.config.plugin_name, env!("CARGO_PKG_VERSION"))
    }

    async fn initialize(&self, host: Arc<dyn HostInterface>) -> InitializeStatus {
        let store = match self.open_store() {
            Ok(store) => store,
            Err(e) => {
                tracing::error!("[RelayAgent] Failed to open store: {}", e);
                return InitializeStatus::Error;
            }
        };

        let context = Arc::new(
            PluginContext::new(host, self.config.clone())
                .with_store(store)
                .with_model(self.model.clone()),
        );
        if let Some(previous) = self.set_context(Some(Arc::clone(&context))) {
            let interrupted = previous.cancellation().interrupt_all();
            tracing::warn!(
                instance_id = %previous.instance_id(),
                interrupted,
                "[RelayAgent] Re-initialized, previous context dropped"
            );
        }

        if let Err(e) = resource::request_resource_info(&context) {
            tracing::error!("[RelayAgent] Failed to request resource info: {}", e);
            self.set_context(None);
            return InitializeStatus::Error;
        }

        tracing::info!(
            instance_id = %context.instance_id(),
            "[RelayAgent] Initialized ({} commands)",
            self.dispatcher.registry().len()
        );
        InitializeStatus::Success
    }

    async fn uninitialize(&self) {
        if let Some(context) = self.set_context(None) {
            let interrupted = context.cancellation().interrupt_all();
            tracing::info!(
                instance_id = %context.instance_id(),
                interrupted,
                "[RelayAgent] Uninitialized"
            );
        }
    }

    async fn invoke(&self, channel_id: ChannelId, data: String, aux: Aux) {
        match self.dispatch(channel_id, &data, aux) {
            Ok(outcome) => {
                tracing::debug!(channel_id, "[RelayAgent] Dispatch {}", outcome.label());
            }
            Err(e) => {
                tracing::warn!(channel_id, "[RelayAgent] Command dropped: {}", e);
            }
        }
    }

    fn stop_stream(&self, channel_id: ChannelId) {
        match self.context() {
            Some(context) => {
                context.streams().unsubscribe(channel_id);
            }
            None => {
                tracing::debug!(channel_id, "[RelayAgent] Stream stopped before initialize");
            }
        }
    }
}
