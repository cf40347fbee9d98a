//! Chat streaming
//!
//! - `chat_out`: the calling channel starts receiving relayed output
//! - `chat_in`: a fresh input channel is opened for the caller; everything
//!   written to it is relayed to the output subscribers

use std::sync::{Arc, Weak};

use crate::core::{Payload, PayloadData, PluginResult};
use crate::host::callback;
use crate::invokable::BoundArgs;
use crate::plugin::PluginContext;
use crate::streaming::open_stream;

/// Declares `context`, `channel_id`
pub fn chat_out(args: BoundArgs) -> PluginResult<()> {
    let ctx = args.context()?;
    ctx.streams().subscribe(args.channel_id()?);
    Ok(())
}

/// Declares `context`, `channel_id`
pub fn chat_in(args: BoundArgs) -> PluginResult<()> {
    let ctx = args.context()?;
    let weak = Arc::downgrade(&ctx);
    open_stream(
        ctx.host(),
        args.channel_id()?,
        callback(move |payload| receive_chat_input(&weak, payload)),
    )?;
    Ok(())
}

/// Callback bound to a chat input channel
pub fn receive_chat_input(context: &Weak<PluginContext>, payload: Payload) {
    let Some(ctx) = context.upgrade() else {
        tracing::debug!("[Chat] Input after uninitialize, dropped");
        return;
    };

    tracing::info!(
        channel_id = payload.receiver_channel_id,
        "[Chat] Received chat input: {}",
        payload.data
    );
    ctx.streams().relay(ctx.host(), &payload.data);

    request_reply(ctx, payload.data.to_string());
}

fn request_reply(ctx: Arc<PluginContext>, prompt: String) {
    let Some(model) = ctx.model().cloned() else {
        return;
    };
    let Some(auth) = ctx.auth() else {
        tracing::debug!("[Chat] Resource info not available yet, no model reply");
        return;
    };
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        tracing::warn!("[Chat] No runtime for the model call, no model reply");
        return;
    };

    runtime.spawn(async move {
        match model.complete(&auth, &prompt).await {
            Ok(reply) => {
                ctx.streams().relay(ctx.host(), &PayloadData::Text(reply));
            }
            Err(e) => {
                tracing::error!(
                    "[Chat] {} call failed: {:#}",
                    model.provider_name(),
                    e
                );
            }
        }
    });
}
