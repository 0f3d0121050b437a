//! Freightd - log/event shipping daemon
//!
//! Reads events from the configured sources (journald, MQTT) and ships
//! them to the configured destinations (stdout, MQTT) through the
//! batching pipeline.
//!
//! # Usage
//!
//! ```bash
//! freightd
//! freightd --config configs/freightd.toml
//! freightd --log-level debug
//! ```

mod adapters;
mod run;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use freight_config::{Config, LogFormat};

/// Freightd - log/event shipping daemon
#[derive(Parser, Debug)]
#[command(name = "freightd")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "configs/freightd.toml")]
    config: std::path::PathBuf,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_file(&cli.config)?;

    let level = cli
        .log_level
        .unwrap_or_else(|| config.log.level.as_str().to_string());
    init_logging(&level, config.log.format)?;

    run::run(config).await
}

/// Initialize the tracing subscriber for logging
fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Console => registry.with(fmt::layer().with_target(true)).init(),
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
    }

    Ok(())
}
