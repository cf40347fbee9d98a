//! `compute` and `interrupt`
//!
//! `compute` sums `0..iterations` in chunks, checking its channel's
//! cancellation flag between chunks. `interrupt` raises that flag.

use std::sync::Arc;

use futures::future::{self, BoxFuture};
use futures::FutureExt;
use serde_json::{json, Value};

use crate::cancellation::{CancelGuard, ChunkOutcome, ChunkedTask};
use crate::core::{Payload, PluginResult};
use crate::invokable::BoundArgs;
use crate::plugin::PluginContext;

/// Declares `context`, `channel_id`, `command`
///
/// Optional command field `iterations` overrides the configured size. Ends
/// with a `FINAL` report `{status, processed, sum}` on the channel, or an
/// error payload if a compute is already running there.
///
/// The channel is claimed before the returned future is first polled, so an
/// `interrupt` dispatched right after this command always finds it.
pub fn compute(args: BoundArgs) -> BoxFuture<'static, PluginResult<()>> {
    match claim_channel(&args) {
        Ok((ctx, guard, total)) => run_compute(ctx, guard, total).boxed(),
        Err(e) => future::ready(Err(e)).boxed(),
    }
}

fn claim_channel(args: &BoundArgs) -> PluginResult<(Arc<PluginContext>, CancelGuard, u64)> {
    let ctx = args.context()?;
    let channel_id = args.channel_id()?;
    let total = args
        .command()?
        .get("iterations")
        .and_then(Value::as_u64)
        .unwrap_or(ctx.config().compute_iterations);

    match ctx.cancellation().begin(channel_id) {
        Ok(guard) => Ok((ctx, guard, total)),
        Err(e) => {
            ctx.send_or_log(Payload::error(channel_id, e.to_string()));
            Err(e)
        }
    }
}

async fn run_compute(ctx: Arc<PluginContext>, guard: CancelGuard, total: u64) -> PluginResult<()> {
    let channel_id = guard.channel_id();
    tracing::info!(channel_id, total, "[Compute] Started");

    let mut sum: u64 = 0;
    let outcome = ChunkedTask::new(&guard, total, ctx.config().compute_chunk_size)
        .run(|i| sum = sum.wrapping_add(i))
        .await;
    drop(guard);

    let status = match outcome {
        ChunkOutcome::Completed { .. } => {
            tracing::info!(channel_id, sum, "[Compute] Finished");
            "completed"
        }
        ChunkOutcome::Interrupted { processed } => {
            tracing::info!(channel_id, processed, sum, "[Compute] Interrupted");
            "interrupted"
        }
    };

    ctx.send_or_log(Payload::final_(
        channel_id,
        json!({
            "status": status,
            "processed": outcome.processed(),
            "sum": sum,
        }),
    ));
    Ok(())
}

/// Declares `context`, `channel_id`, `command`
///
/// Targets the command's `channel_id` field if present, otherwise the
/// channel it arrived on. Nothing running there is not an error. A
/// `channel_id` that is not an integer interrupts nothing.
pub fn interrupt(args: BoundArgs) -> PluginResult<()> {
    let ctx = args.context()?;
    let channel_id = args.channel_id()?;
    let target = match args.command()?.get("channel_id") {
        None => channel_id,
        Some(value) => match value.as_i64() {
            Some(target) => target,
            None => {
                tracing::warn!(
                    channel_id,
                    "[Compute] Ignoring interrupt with invalid target {}",
                    value
                );
                return Ok(());
            }
        },
    };

    ctx.cancellation().interrupt(target);
    Ok(())
}
