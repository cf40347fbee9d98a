use std::sync::Arc;

use anyhow::Context;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

use relay_agent_sdk::cli::Console;
use relay_agent_sdk::config::PluginConfig;
use relay_agent_sdk::core::{ChannelId, Payload};
use relay_agent_sdk::host::{HostConfig, HostInterface, LocalHost};
use relay_agent_sdk::logging::{self, LogConfig};
use relay_agent_sdk::plugin::{AgentPlugin, InitializeStatus, RelayAgent};

/// Channel the console reads chat output on
const OUTPUT_CHANNEL: ChannelId = 1;

/// Channel compute and interrupt are sent on
const COMPUTE_CHANNEL: ChannelId = 2;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _log_guard = logging::init_logging(&LogConfig::from_env().with_level("warn"))?;

    let console = Console::new();
    let api_key = std::env::var("ANTHROPIC_API_KEY").unwrap_or_default();

    let host = LocalHost::new(
        HostConfig::default()
            .with_first_channel_id(1000)
            .with_resource_info(json!({ "name": "resource_info", "api_keys": [api_key] })),
    );
    let agent = Arc::new(RelayAgent::new(PluginConfig::from_env()));
    console.print_banner(&agent.plugin_info());

    let mut output = host.subscribe_output();
    if agent.initialize(Arc::new(host.clone())).await != InitializeStatus::Success {
        anyhow::bail!("Plugin failed to initialize");
    }
    let loop_handle = host.run(agent.clone());

    if !host.wait_initialized().await {
        console.print_error("Host resource info was rejected");
    }

    host.invoke_plugin(OUTPUT_CHANNEL, &json!({ "name": "chat_out" }))?;
    host.invoke_plugin(OUTPUT_CHANNEL, &json!({ "name": "chat_in" }))?;

    let input_channel = loop {
        let payload = output
            .recv()
            .await
            .context("Host closed before the input channel was opened")?;
        if payload.receiver_channel_id != OUTPUT_CHANNEL {
            continue;
        }
        if let Some(id) = payload.data.as_channel() {
            console.print_payload(&payload);
            break id;
        }
    };

    let printer = tokio::spawn(async move {
        loop {
            match output.recv().await {
                Ok(payload) => console.print_payload(&payload),
                Err(RecvError::Lagged(skipped)) => {
                    console.print_error(&format!("{} payloads dropped", skipped));
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    console.print_prompt()?;
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "q" => break,
            "c" => host.invoke_plugin(COMPUTE_CHANNEL, &json!({ "name": "compute" }))?,
            "i" => host.invoke_plugin(COMPUTE_CHANNEL, &json!({ "name": "interrupt" }))?,
            "" => {}
            text => host.send_payload(Payload::new(input_channel, text))?,
        }
        console.print_prompt()?;
    }

    agent.uninitialize().await;
    host.shutdown()?;
    loop_handle.await?;
    printer.abort();

    Ok(())
}
