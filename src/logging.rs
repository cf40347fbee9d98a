//! Logging setup
//!
//! Installs a `tracing` subscriber with:
//! - An `EnvFilter` (`RUST_LOG` wins over the configured level)
//! - A stderr layer
//! - An optional daily-rolling file layer behind a non-blocking writer
//!
//! Either layer can emit JSON instead of text.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

pub const ENV_LOG_DIR: &str = "RELAY_AGENT_LOG_DIR";
pub const ENV_LOG_JSON: &str = "RELAY_AGENT_LOG_JSON";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Logging options
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,

    /// Directory for rolling log files, `None` for stderr only
    pub log_dir: Option<PathBuf>,

    /// File name prefix inside `log_dir`
    pub file_name: String,

    /// Emit newline-delimited JSON
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: None,
            file_name: "relay-agent.log".to_string(),
            json: false,
        }
    }
}

impl LogConfig {
    /// Defaults, plus `RELAY_AGENT_LOG_DIR` and `RELAY_AGENT_LOG_JSON`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(dir) = std::env::var(ENV_LOG_DIR) {
            if !dir.is_empty() {
                config.log_dir = Some(PathBuf::from(dir));
            }
        }
        if let Ok(json) = std::env::var(ENV_LOG_JSON) {
            config.json = matches!(json.as_str(), "1" | "true" | "yes");
        }
        config
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }
}

fn fmt_layer<W>(writer: W, json: bool, ansi: bool) -> BoxedLayer
where
    W: for<'w> fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    if json {
        fmt::layer().json().with_writer(writer).boxed()
    } else {
        fmt::layer().with_writer(writer).with_ansi(ansi).boxed()
    }
}

/// Install the global subscriber
///
/// Keep the returned guard alive for as long as file logging should
/// flush; it is `None` when no log directory is configured. Fails if a
/// global subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .with_context(|| format!("Invalid log filter '{}'", config.level))?;

    let mut layers: Vec<BoxedLayer> = vec![fmt_layer(std::io::stderr, config.json, true)];

    let guard = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, &config.file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            layers.push(fmt_layer(writer, config.json, false));
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}
