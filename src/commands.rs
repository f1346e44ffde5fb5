//! CLI command handlers.
//!
//! Every command opens the home from the state directory, does its work, and
//! closes it again so the final device state is persisted even when the
//! command fails or is interrupted.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, bail};
use serde::Serialize;
use tokio::signal;
use tracing::{info, warn};

use smarthome_core::{ActuatorState, JsonFileStore, LightState, SmartHomeClient};
use smarthome_reconciler::{
    InMemoryDesiredStateProvider, LoopConfig, LoopReport, ReconcilerBuilder, ReconciliationLoop,
};

use crate::cli::Commands;
use crate::config::AppConfig;
use crate::desired::DesiredState;

/// Execute a CLI command.
///
/// This is the main command dispatcher that routes to the appropriate handler.
pub async fn execute_command(command: Commands, config: &AppConfig) -> Result<()> {
    match command {
        Commands::Set { name, percentage } => cmd_set(name, percentage, config).await,
        Commands::Apply { file } => cmd_apply(file, config).await,
        Commands::Light { name, on, .. } => cmd_light(&name, on, config).await,
        Commands::List { json } => cmd_list(json, config).await,
    }
}

/// Open the home persisted under the configured state directory.
///
/// # Errors
///
/// Returns an error if the actuator settings are invalid.
pub async fn open_home(config: &AppConfig) -> Result<SmartHomeClient> {
    info!(state_dir = %config.state_dir.display(), "Opening smart home");
    let store = Arc::new(JsonFileStore::new(&config.state_dir));
    Ok(SmartHomeClient::open(config.actuator.clone(), store).await?)
}

/// Switch the declared lights, then reconcile the declared shutters until
/// they settle or Ctrl+C is pressed.
///
/// # Errors
///
/// Returns an error if the reconciler cannot be built or the loop fails.
pub async fn apply_desired(
    home: &SmartHomeClient,
    desired: &DesiredState,
    config: &AppConfig,
) -> Result<LoopReport> {
    for (name, on) in &desired.lights {
        home.lights().switch(name, *on).await;
    }

    let reconciler = ReconcilerBuilder::new()
        .with_backend(home.shutters().clone())
        .with_config(config.reconciler.clone())
        .build()?;
    let provider = InMemoryDesiredStateProvider::new(desired.shutters.clone());
    let reconciliation = ReconciliationLoop::new(
        Arc::new(reconciler),
        Arc::new(provider),
        LoopConfig::default(),
    );

    let stopper = reconciliation.stopper();
    let interrupt = tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, stopping reconciliation");
                stopper.stop();
            }
            Err(err) => warn!("Failed to listen for Ctrl+C: {}", err),
        }
    });

    let report = reconciliation.run_until_settled().await;
    interrupt.abort();
    Ok(report?)
}

/// Move one shutter and wait until it arrives.
async fn cmd_set(name: String, percentage: i64, config: &AppConfig) -> Result<()> {
    let desired = DesiredState {
        shutters: [(name, percentage)].into_iter().collect(),
        ..DesiredState::default()
    };
    run_desired(&desired, config).await
}

/// Apply a desired-state file.
async fn cmd_apply(file: PathBuf, config: &AppConfig) -> Result<()> {
    let desired = DesiredState::from_file(&file).await?;
    if desired.is_empty() {
        warn!(file = %file.display(), "Desired state declares nothing");
    }
    run_desired(&desired, config).await
}

async fn run_desired(desired: &DesiredState, config: &AppConfig) -> Result<()> {
    let home = open_home(config).await?;
    let report = apply_desired(&home, desired, config).await;
    home.close().await;

    let report = report?;
    display_report(&report);

    let rejected = report.rejected().count();
    if rejected > 0 {
        bail!("{rejected} shutter(s) rejected");
    }
    if report.stopped {
        bail!("Interrupted before all shutters arrived");
    }
    Ok(())
}

/// Switch a light.
async fn cmd_light(name: &str, on: bool, config: &AppConfig) -> Result<()> {
    let home = open_home(config).await?;
    home.lights().switch(name, on).await;
    home.close().await;

    println!("Light '{}' is {}", name, if on { "on" } else { "off" });
    Ok(())
}

#[derive(Serialize)]
struct Listing {
    shutters: Vec<ActuatorState>,
    lights: Vec<LightState>,
}

/// Show all known shutters and lights.
async fn cmd_list(json: bool, config: &AppConfig) -> Result<()> {
    let home = open_home(config).await?;
    let listing = Listing {
        shutters: home.shutters().list().await,
        lights: home.lights().list().await,
    };
    home.close().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
    } else {
        display_listing(&listing);
    }
    Ok(())
}

fn display_listing(listing: &Listing) {
    if listing.shutters.is_empty() && listing.lights.is_empty() {
        println!("No devices found");
        println!("\nHint: Use 'smarthome set <name> <percentage>' to move a shutter");
        return;
    }

    if !listing.shutters.is_empty() {
        println!("\nShutters ({} total):\n", listing.shutters.len());
        for shutter in &listing.shutters {
            println!("  {:<16} {:>3}% closed", shutter.name, shutter.current);
        }
    }

    if !listing.lights.is_empty() {
        println!("\nLights ({} total):\n", listing.lights.len());
        for light in &listing.lights {
            println!("  {:<16} {}", light.name, if light.on { "on" } else { "off" });
        }
    }
}

fn display_report(report: &LoopReport) {
    for (name, outcome) in &report.outcomes {
        match (&outcome.error, outcome.observed_current) {
            (Some(error), _) => println!("  {name:<16} rejected: {error}"),
            (None, Some(current)) if !outcome.requeue => {
                println!("  {name:<16} {current:>3}% closed");
            }
            (None, Some(current)) => println!("  {name:<16} {current:>3}% closed (moving)"),
            (None, None) => println!("  {name:<16} unknown"),
        }
    }
}
