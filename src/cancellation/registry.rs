//! Per-channel cancellation registry
//!
//! A cancellable task calls [`CancellationRegistry::begin`] for its channel
//! and keeps the returned [`CancelGuard`] alive while it runs. Any other
//! invocation can raise the flag with [`CancellationRegistry::interrupt`].
//! Dropping the guard removes the entry, so the flag never outlives its
//! task whatever way the task exits.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio_util::sync::CancellationToken;

use crate::core::{ChannelId, PluginError, PluginResult};

struct Entry {
    id: u64,
    token: CancellationToken,
}

/// Channel id -> cancellation flag of the task running there
#[derive(Default)]
pub struct CancellationRegistry {
    entries: Mutex<HashMap<ChannelId, Entry>>,
    next_entry_id: AtomicU64,
}

impl CancellationRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<ChannelId, Entry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a cancellable task on `channel_id`
    ///
    /// Fails with `TaskAlreadyRunning` if a task already holds the channel;
    /// the earlier task stays cancellable.
    pub fn begin(self: &Arc<Self>, channel_id: ChannelId) -> PluginResult<CancelGuard> {
        let mut entries = self.entries();
        if entries.contains_key(&channel_id) {
            return Err(PluginError::TaskAlreadyRunning(channel_id));
        }

        let id = self.next_entry_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        entries.insert(
            channel_id,
            Entry {
                id,
                token: token.clone(),
            },
        );
        tracing::debug!(channel_id, "[Cancellation] Task registered");

        Ok(CancelGuard {
            registry: Arc::clone(self),
            channel_id,
            entry_id: id,
            token,
        })
    }

    /// Raise the flag of the task running on `channel_id`
    ///
    /// Returns false when no task is registered there; that is not an error.
    pub fn interrupt(&self, channel_id: ChannelId) -> bool {
        match self.entries().get(&channel_id) {
            Some(entry) => {
                entry.token.cancel();
                tracing::info!(channel_id, "[Cancellation] Interrupt signal sent");
                true
            }
            None => {
                tracing::debug!(channel_id, "[Cancellation] No task to interrupt");
                false
            }
        }
    }

    /// Raise every flag, returns how many tasks were signalled
    pub fn interrupt_all(&self) -> usize {
        let entries = self.entries();
        for entry in entries.values() {
            entry.token.cancel();
        }
        entries.len()
    }

    /// Remove the entry for `channel_id`
    ///
    /// Normally done by dropping the [`CancelGuard`]. Returns false if there
    /// was nothing to remove.
    pub fn end(&self, channel_id: ChannelId) -> bool {
        let removed = self.entries().remove(&channel_id).is_some();
        if removed {
            tracing::debug!(channel_id, "[Cancellation] Task unregistered");
        }
        removed
    }

    /// Check whether a task is registered on `channel_id`
    pub fn is_active(&self, channel_id: ChannelId) -> bool {
        self.entries().contains_key(&channel_id)
    }

    /// Channels with a registered task
    pub fn active_channels(&self) -> Vec<ChannelId> {
        self.entries().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    // Only removes the entry the guard created; after an explicit `end` the
    // channel may already belong to a newer task.
    fn release(&self, channel_id: ChannelId, entry_id: u64) {
        let mut entries = self.entries();
        if entries.get(&channel_id).is_some_and(|e| e.id == entry_id) {
            entries.remove(&channel_id);
            tracing::debug!(channel_id, "[Cancellation] Task unregistered");
        }
    }
}

/// Ownership of a channel's cancellation flag
///
/// The entry is removed when the guard is dropped.
pub struct CancelGuard {
    registry: Arc<CancellationRegistry>,
    channel_id: ChannelId,
    entry_id: u64,
    token: CancellationToken,
}

impl CancelGuard {
    pub fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    /// Non-blocking flag check
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The underlying token, e.g. to `select!` on `cancelled()`
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        self.registry.release(self.channel_id, self.entry_id);
    }
}

impl std::fmt::Debug for CancelGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelGuard")
            .field("channel_id", &self.channel_id)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
