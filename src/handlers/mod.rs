//! Built-in invokables
//!
//! | Command | Declares | Kind |
//! |---------|----------|------|
//! | `compute` | context, channel_id, command | async |
//! | `interrupt` | context, channel_id, command | sync |
//! | `chat_out` / `get_chat_output` | context, channel_id | sync |
//! | `chat_in` / `get_chat_input_channel` | context, channel_id | sync |
//! | `cout` | channel_id, aux | sync |
//!
//! `get_resource_info` is served by the host, not registered here.

pub mod chat;
pub mod compute;
pub mod diagnostics;
pub mod resource;

use crate::invokable::{InvokableRegistry, Param};

pub const COMPUTE: &str = "compute";
pub const INTERRUPT: &str = "interrupt";
pub const CHAT_OUT: &str = "chat_out";
pub const GET_CHAT_OUTPUT: &str = "get_chat_output";
pub const CHAT_IN: &str = "chat_in";
pub const GET_CHAT_INPUT_CHANNEL: &str = "get_chat_input_channel";
pub const COUT: &str = "cout";
pub const GET_RESOURCE_INFO: &str = "get_resource_info";

/// Registry holding every built-in command
pub fn builtin_registry() -> InvokableRegistry {
    let mut registry = InvokableRegistry::new();

    registry
        .register_async(
            COMPUTE,
            &[Param::Context, Param::ChannelId, Param::Command],
            compute::compute,
        )
        .register_sync(
            INTERRUPT,
            &[Param::Context, Param::ChannelId, Param::Command],
            compute::interrupt,
        )
        .register_sync(CHAT_OUT, &[Param::Context, Param::ChannelId], chat::chat_out)
        .register_sync(CHAT_IN, &[Param::Context, Param::ChannelId], chat::chat_in)
        .register_sync(COUT, &[Param::ChannelId, Param::Aux], diagnostics::cout);

    registry.alias(GET_CHAT_OUTPUT, CHAT_OUT);
    registry.alias(GET_CHAT_INPUT_CHANNEL, CHAT_IN);

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PluginConfig;
    use crate::dispatch::{DispatchOutcome, Dispatcher};
    use crate::host::{HostConfig, HostInterface, LocalHost};
    use crate::plugin::PluginContext;
    use serde_json::json;
    use std::sync::Arc;

    fn setup() -> (LocalHost, Arc<PluginContext>, Dispatcher) {
        let host = LocalHost::new(HostConfig::default().with_first_channel_id(100));
        let config = PluginConfig::default().with_compute_chunk_size(10);
        let ctx = Arc::new(PluginContext::new(Arc::new(host.clone()), config));
        (host, ctx, Dispatcher::new(Arc::new(builtin_registry())))
    }

    fn cmd(body: serde_json::Value) -> String {
        body.to_string()
    }

    #[test]
    fn test_builtin_names() {
        let registry = builtin_registry();
        for name in [
            COMPUTE,
            INTERRUPT,
            CHAT_OUT,
            GET_CHAT_OUTPUT,
            CHAT_IN,
            GET_CHAT_INPUT_CHANNEL,
            COUT,
        ] {
            assert!(registry.contains(name), "missing {}", name);
        }
        assert!(!registry.contains(GET_RESOURCE_INFO));
        assert!(registry.lookup(COMPUTE).unwrap().is_async());
        assert_eq!(
            registry.lookup(COUT).unwrap().params(),
            &[Param::ChannelId, Param::Aux]
        );
    }

    #[tokio::test]
    async fn test_chat_out_aliases_subscribe_once() {
        let (_host, ctx, dispatcher) = setup();

        dispatcher.dispatch(&ctx, 5, &cmd(json!({"name": CHAT_OUT})), None);
        dispatcher.dispatch(&ctx, 5, &cmd(json!({"name": GET_CHAT_OUTPUT})), None);

        assert_eq!(ctx.streams().subscribers(), vec![5]);
    }

    #[tokio::test]
    async fn test_chat_in_binds_new_channel() {
        let (host, ctx, dispatcher) = setup();

        let outcome = dispatcher.dispatch(&ctx, 5, &cmd(json!({"name": CHAT_IN})), None);

        assert!(matches!(outcome, DispatchOutcome::Completed));
        assert!(host.has_callback(100));
        assert_eq!(host.new_channel_id(), 101);
    }

    #[tokio::test]
    async fn test_interrupt_without_compute_is_noop() {
        let (_host, ctx, dispatcher) = setup();
        let outcome = dispatcher.dispatch(&ctx, 4, &cmd(json!({"name": INTERRUPT})), None);
        assert!(matches!(outcome, DispatchOutcome::Completed));
        assert!(ctx.cancellation().is_empty());
    }

    #[tokio::test]
    async fn test_compute_releases_channel() {
        let (_host, ctx, dispatcher) = setup();

        let outcome = dispatcher.dispatch(
            &ctx,
            4,
            &cmd(json!({"name": COMPUTE, "iterations": 1000})),
            None,
        );
        let DispatchOutcome::Scheduled(handle) = outcome else {
            panic!("compute should be scheduled");
        };
        handle.await.unwrap();

        assert!(!ctx.cancellation().is_active(4));
    }

    #[tokio::test]
    async fn test_interrupt_targets_named_channel() {
        let (_host, ctx, dispatcher) = setup();
        let guard = ctx.cancellation().begin(9).unwrap();

        dispatcher.dispatch(
            &ctx,
            1,
            &cmd(json!({"name": INTERRUPT, "channel_id": 9})),
            None,
        );

        assert!(guard.is_cancelled());
    }

    #[tokio::test]
    async fn test_compute_claims_channel_at_dispatch() {
        let (_host, ctx, dispatcher) = setup();

        let outcome = dispatcher.dispatch(&ctx, 6, &cmd(json!({"name": COMPUTE})), None);
        // Not yet polled, but already interruptible
        assert!(ctx.cancellation().is_active(6));
        dispatcher.dispatch(&ctx, 6, &cmd(json!({"name": INTERRUPT})), None);

        let DispatchOutcome::Scheduled(handle) = outcome else {
            panic!("compute should be scheduled");
        };
        handle.await.unwrap();
        assert!(!ctx.cancellation().is_active(6));
    }

    #[tokio::test]
    async fn test_interrupt_with_invalid_target_is_ignored() {
        let (_host, ctx, dispatcher) = setup();
        let guard = ctx.cancellation().begin(5).unwrap();

        for target in [json!("9"), json!(9.0), json!(null)] {
            let outcome = dispatcher.dispatch(
                &ctx,
                5,
                &cmd(json!({"name": INTERRUPT, "channel_id": target})),
                None,
            );
            assert!(matches!(outcome, DispatchOutcome::Completed));
        }

        assert!(!guard.is_cancelled());
    }

    #[tokio::test]
    async fn test_cout_accepts_missing_aux() {
        let (_host, ctx, dispatcher) = setup();
        let outcome = dispatcher.dispatch(&ctx, 1, &cmd(json!({"name": COUT})), None);
        assert!(matches!(outcome, DispatchOutcome::Completed));
    }
}
