//! Dispatcher - Routes raw commands to registered invokables
//!
//! For every delivery the dispatcher:
//! - Decodes the raw text into a [`Command`]
//! - Looks up the handler by name
//! - Binds only the parameters the handler declared
//! - Runs sync handlers inline and spawns async ones as their own task
//!
//! An async handler is called before its future is spawned, so anything it
//! does ahead of the returned future (claiming a channel, say) is done by the
//! time `dispatch` returns.
//!
//! Nothing here fails: every problem becomes a [`DispatchOutcome`] and a log
//! line.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::core::{Aux, ChannelId, Command, PluginError};
use crate::invokable::{ArgEnv, HandlerFn, InvokableRegistry};
use crate::plugin::PluginContext;

/// What happened to one delivery
pub enum DispatchOutcome {
    /// A sync handler ran to completion
    Completed,
    /// An async handler was spawned
    Scheduled(JoinHandle<()>),
    /// A sync handler returned an error
    HandlerFailed(PluginError),
    /// No handler under this name
    UnknownCommand(String),
    /// The command text could not be decoded
    Malformed(PluginError),
}

impl DispatchOutcome {
    /// Short label for logs
    pub fn label(&self) -> &'static str {
        match self {
            DispatchOutcome::Completed => "completed",
            DispatchOutcome::Scheduled(_) => "scheduled",
            DispatchOutcome::HandlerFailed(_) => "handler_failed",
            DispatchOutcome::UnknownCommand(_) => "unknown_command",
            DispatchOutcome::Malformed(_) => "malformed",
        }
    }
}

impl fmt::Debug for DispatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchOutcome::Completed => f.write_str("Completed"),
            DispatchOutcome::Scheduled(_) => f.write_str("Scheduled"),
            DispatchOutcome::HandlerFailed(e) => f.debug_tuple("HandlerFailed").field(e).finish(),
            DispatchOutcome::UnknownCommand(n) => f.debug_tuple("UnknownCommand").field(n).finish(),
            DispatchOutcome::Malformed(e) => f.debug_tuple("Malformed").field(e).finish(),
        }
    }
}

/// Routes commands through an [`InvokableRegistry`]
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<InvokableRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<InvokableRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<InvokableRegistry> {
        &self.registry
    }

    /// Dispatch one command delivered on `channel_id`
    ///
    /// Async handlers must be dispatched from inside a tokio runtime.
    pub fn dispatch(
        &self,
        context: &Arc<PluginContext>,
        channel_id: ChannelId,
        raw: &str,
        aux: Aux,
    ) -> DispatchOutcome {
        let command = match Command::decode(raw) {
            Ok(command) => command,
            Err(e) => {
                tracing::warn!(channel_id, "[Dispatcher] Dropping command: {}", e);
                return DispatchOutcome::Malformed(e);
            }
        };

        let Some(descriptor) = self.registry.lookup(&command.name) else {
            tracing::warn!(
                channel_id,
                "[Dispatcher] Plugin does not have invokable {}",
                command.name
            );
            return DispatchOutcome::UnknownCommand(command.name);
        };

        let name = command.name.clone();
        let args = ArgEnv::new(Arc::clone(context), channel_id, command, aux)
            .bind(descriptor.params());

        tracing::debug!(
            channel_id,
            "[Dispatcher] Invoking '{}' with {:?}",
            name,
            descriptor.param_names()
        );

        match descriptor.handler() {
            HandlerFn::Sync(handler) => {
                let result = std::panic::catch_unwind(AssertUnwindSafe(|| handler(args)));
                match result {
                    Ok(Ok(())) => DispatchOutcome::Completed,
                    Ok(Err(e)) => {
                        tracing::error!(channel_id, "[Dispatcher] '{}' failed: {}", name, e);
                        DispatchOutcome::HandlerFailed(e)
                    }
                    Err(_) => {
                        tracing::error!(channel_id, "[Dispatcher] '{}' panicked", name);
                        DispatchOutcome::HandlerFailed(PluginError::other(format!(
                            "handler '{}' panicked",
                            name
                        )))
                    }
                }
            }
            HandlerFn::Async(handler) => {
                let future = handler(args);
                let handle = tokio::spawn(async move {
                    if let Err(e) = future.await {
                        tracing::error!(channel_id, "[Dispatcher] '{}' failed: {}", name, e);
                    }
                });
                DispatchOutcome::Scheduled(handle)
            }
        }
    }
}
