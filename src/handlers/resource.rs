//! Resource info handshake
//!
//! `initialize` asks the host for its resource info and returns right away.
//! The reply arrives on a callback, which stores the info and reports the
//! outcome through `on_initialized`.

use std::sync::{Arc, Weak};

use serde_json::json;

use crate::core::{InvokeCommand, Payload, PluginError, PluginResult, ResourceInfo};
use crate::host::{callback, HOST_TARGET};
use crate::plugin::PluginContext;

use super::GET_RESOURCE_INFO;

/// Ask the host for resource info
pub fn request_resource_info(ctx: &Arc<PluginContext>) -> PluginResult<()> {
    let reply_channel = ctx.host().new_channel_id();
    let command = InvokeCommand::new(
        reply_channel,
        HOST_TARGET,
        &json!({ "name": GET_RESOURCE_INFO }),
    );
    let weak = Arc::downgrade(ctx);

    ctx.host().invoke_with_callback(
        command,
        callback(move |payload| receive_resource_info(&weak, payload)),
    )?;

    tracing::debug!(reply_channel, "[Resources] Requested resource info");
    Ok(())
}

/// Callback for the host's resource info reply
pub fn receive_resource_info(context: &Weak<PluginContext>, payload: Payload) {
    let Some(ctx) = context.upgrade() else {
        return;
    };

    let success = match apply_resource_info(&ctx, &payload) {
        Ok(()) => true,
        Err(e) => {
            tracing::error!("[Resources] Resource info rejected: {}", e);
            false
        }
    };
    ctx.host().on_initialized(success);
}

fn apply_resource_info(ctx: &PluginContext, payload: &Payload) -> PluginResult<()> {
    if payload.flags.is_error() {
        return Err(PluginError::ResourceUnavailable(payload.data.to_string()));
    }

    let info = ResourceInfo::from_json(payload.data.to_json()?)?;
    tracing::info!(
        "[Resources] Received resource info with {} api key(s)",
        info.api_keys.len()
    );

    if let Some(store) = ctx.store() {
        if let Err(e) = store.save_resource_info(&info) {
            tracing::warn!("[Resources] Could not persist resource info: {}", e);
        }
    }

    ctx.resources().set(info)
}
