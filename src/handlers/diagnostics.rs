use crate::core::PluginResult;
use crate::invokable::BoundArgs;

/// Declares `channel_id`, `aux`
pub fn cout(args: BoundArgs) -> PluginResult<()> {
    let channel_id = args.channel_id()?;
    match args.aux()? {
        Some(aux) => tracing::info!(channel_id, "[cout] {}", aux),
        None => tracing::info!(channel_id, "[cout] <no aux>"),
    }
    Ok(())
}
