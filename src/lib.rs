#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! # smarthome
//!
//! Command-line front end for the smart home: drives shutters toward declared
//! positions through the reconciler and persists device state between runs.

pub mod cli;
pub mod commands;
pub mod config;
pub mod desired;
