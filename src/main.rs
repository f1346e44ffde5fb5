//! # smarthome
//!
//! Entry point of the smart home controller.
//!
//! ## Startup
//!
//! 1. **Tracing** - `RUST_LOG` filter, `info` by default
//! 2. **Configuration** - config file, then `SMARTHOME_*` overrides, then flags
//! 3. **Command** - opens the home from the state directory and runs
//!
//! ## Shutdown
//!
//! Ctrl+C stops a running reconciliation. Shutters finish the move they are
//! making and the home is persisted before the process exits.

#![forbid(unsafe_code)]
#![forbid(clippy::unwrap_used)]
#![forbid(clippy::panic)]
#![deny(clippy::expect_used)]

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use smarthome::cli::Cli;
use smarthome::commands::execute_command;
use smarthome::config::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())
        .context("Configuration failed. Please check the config file and SMARTHOME_* variables")?
        .with_state_dir(cli.state_dir);
    debug!(?config, "Configuration resolved");

    execute_command(cli.command, &config).await
}

/// Initialize tracing subscriber with environment filter.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
