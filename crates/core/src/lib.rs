//! Smart home device core.
//!
//! Shutters are modelled as rate-limited actuators: a requested position is
//! queued, and a per-shutter background worker moves toward it a bounded
//! step at a time. Lights switch instantly.
//!
//! - [`Actuator`] - one shutter: command queue, convergence worker, snapshot
//! - [`ActuatorRegistry`] - one actuator per name, created on first use
//! - [`LightRegistry`] - on/off lights
//! - [`StateStore`] - persistence boundary used at open/close
//! - [`SmartHomeClient`] - all of the above behind one handle
//!
//! # Example
//!
//! ```ignore
//! use smarthome_core::{ActuatorConfig, ActuatorRegistry};
//!
//! #[tokio::main]
//! async fn main() -> smarthome_core::Result<()> {
//!     let registry = ActuatorRegistry::new(ActuatorConfig::default())?;
//!     let kitchen = registry.get_or_create("kitchen").await;
//!     kitchen.set_target(43).await?;
//!     println!("{:?}", kitchen.snapshot().await);
//!     registry.close().await;
//!     Ok(())
//! }
//! ```

pub mod actuator;
pub mod client;
pub mod config;
pub mod error;
pub mod lights;
pub mod percentage;
pub mod persistence;
pub mod registry;
pub mod result;
pub mod state;

pub use actuator::{Actuator, ActuatorEvent, next_position};
pub use client::SmartHomeClient;
pub use config::{ActuatorConfig, RetargetPolicy};
pub use error::{Error, ValidationError};
pub use lights::LightRegistry;
pub use percentage::Percentage;
pub use persistence::{InMemoryStateStore, JsonFileStore, StateStore};
pub use registry::ActuatorRegistry;
pub use result::{Result, ResultExt};
pub use state::{ActuatorState, LightState};
