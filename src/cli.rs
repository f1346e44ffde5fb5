//! CLI command definitions using clap.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// smarthome - shutters and lights
#[derive(Parser, Debug)]
#[command(name = "smarthome")]
#[command(version)]
#[command(about = "Drive rate-limited shutters and lights toward declared positions")]
#[command(
    long_about = "smarthome moves shutters at most a few percent per second until they match the declared position, switches lights, and keeps device state across runs."
)]
pub struct Cli {
    /// Configuration file (TOML, or JSON when it ends in .json)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory for persisted device state
    #[arg(long, global = true)]
    pub state_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Move one shutter and wait until it arrives
    Set {
        /// Shutter name
        name: String,

        /// Closed percentage, 0 (open) to 100 (closed)
        #[arg(allow_negative_numbers = true)]
        percentage: i64,
    },

    /// Apply a desired-state file and wait until every shutter arrives
    Apply {
        /// TOML file with [shutters] and [lights] tables
        file: PathBuf,
    },

    /// Switch a light
    Light {
        /// Light name
        name: String,

        /// Switch the light on
        #[arg(long, conflicts_with = "off", required_unless_present = "off")]
        on: bool,

        /// Switch the light off
        #[arg(long)]
        off: bool,
    },

    /// Show all known shutters and lights
    List {
        /// Print JSON instead of a table
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}
