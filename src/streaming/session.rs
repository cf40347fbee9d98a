//! Streaming sessions
//!
//! Two halves:
//! - [`open_stream`] allocates a fresh channel, binds a callback to it and
//!   tells the requesting channel which id to send on
//! - [`StreamSessions`] keeps the ordered set of channels subscribed to
//!   relayed output and fans data out to them

use std::sync::{Mutex, MutexGuard};

use crate::core::{ChannelId, Payload, PayloadData, PluginError, PluginResult};
use crate::host::{HostInterface, PayloadCallback};

/// Allocate a channel for incoming data and announce it to `origin`
///
/// `callback` is bound to the new channel before the id is sent, so nothing
/// written to the channel can arrive unhandled. The announcement is a `FINAL`
/// payload carrying the new id. If it cannot be sent the callback stays
/// bound and the error is returned.
pub fn open_stream(
    host: &dyn HostInterface,
    origin: ChannelId,
    callback: PayloadCallback,
) -> PluginResult<ChannelId> {
    let stream_channel_id = host.new_channel_id();
    host.register_callback(stream_channel_id, callback);
    if let Err(e) = host.send_payload(Payload::final_(
        origin,
        PayloadData::Channel(stream_channel_id),
    )) {
        tracing::warn!(
            origin,
            stream_channel_id,
            "[StreamSessions] Announcement failed, callback left bound: {}",
            e
        );
        return Err(e);
    }

    tracing::info!(
        origin,
        stream_channel_id,
        "[StreamSessions] Opened input stream"
    );
    Ok(stream_channel_id)
}

/// Result of one relay
#[derive(Debug, Default)]
pub struct RelayReport {
    /// Channels the data was handed to
    pub delivered: Vec<ChannelId>,
    /// Channels whose send failed, with the error
    pub failed: Vec<(ChannelId, PluginError)>,
}

impl RelayReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Channels subscribed to relayed output, in subscription order
#[derive(Debug, Default)]
pub struct StreamSessions {
    receiving: Mutex<Vec<ChannelId>>,
}

impl StreamSessions {
    pub fn new() -> Self {
        Self::default()
    }

    fn receiving(&self) -> MutexGuard<'_, Vec<ChannelId>> {
        self.receiving.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a channel to the receiving set
    ///
    /// Returns false if it was already subscribed.
    pub fn subscribe(&self, channel_id: ChannelId) -> bool {
        let mut receiving = self.receiving();
        if receiving.contains(&channel_id) {
            tracing::debug!(channel_id, "[StreamSessions] Already subscribed");
            return false;
        }
        receiving.push(channel_id);
        tracing::info!(channel_id, "[StreamSessions] Subscribed");
        true
    }

    /// Remove a channel from the receiving set
    pub fn unsubscribe(&self, channel_id: ChannelId) -> bool {
        let mut receiving = self.receiving();
        let before = receiving.len();
        receiving.retain(|c| *c != channel_id);
        let removed = receiving.len() != before;
        if removed {
            tracing::info!(channel_id, "[StreamSessions] Unsubscribed");
        }
        removed
    }

    /// Snapshot of the subscribers, in order
    pub fn subscribers(&self) -> Vec<ChannelId> {
        self.receiving().clone()
    }

    pub fn is_subscribed(&self, channel_id: ChannelId) -> bool {
        self.receiving().contains(&channel_id)
    }

    pub fn len(&self) -> usize {
        self.receiving().len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiving().is_empty()
    }

    /// Send `data` to every subscriber
    ///
    /// A failed send is recorded and the remaining subscribers still get the
    /// data. The lock is released before sending.
    pub fn relay(&self, host: &dyn HostInterface, data: &PayloadData) -> RelayReport {
        let mut report = RelayReport::default();

        for channel_id in self.subscribers() {
            match host.send_payload(Payload::new(channel_id, data.clone())) {
                Ok(()) => report.delivered.push(channel_id),
                Err(e) => {
                    tracing::warn!(channel_id, "[StreamSessions] Relay failed: {}", e);
                    report.failed.push((channel_id, e));
                }
            }
        }

        tracing::debug!(
            delivered = report.delivered.len(),
            failed = report.failed.len(),
            "[StreamSessions] Relayed"
        );
        report
    }
}
