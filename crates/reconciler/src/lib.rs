//! K8s-style reconciliation for shutter positions.
//!
//! This crate implements a reconciliation pattern inspired by Kubernetes:
//!
//! - **Desired State**: a declared closed percentage per shutter
//! - **Actual State**: the actuator snapshot read right after issuing it
//! - **Decision**: converged, requeue, retry later, or reject for good
//!
//! # Reconciliation
//!
//! [`ShutterReconciler::reconcile`] never waits for a shutter to arrive. It
//! queues the desired target, looks at the shutter once, and tells its caller
//! whether to come back. [`ReconciliationLoop`] is such a caller: it keeps
//! re-invoking the reconciler at the requested interval.
//!
//! # Example
//!
//! ```ignore
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//!
//! use smarthome_core::{ActuatorConfig, ActuatorRegistry};
//! use smarthome_reconciler::{
//!     InMemoryDesiredStateProvider, LoopConfig, ReconcilerBuilder, ReconciliationLoop,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = Arc::new(ActuatorRegistry::new(ActuatorConfig::default())?);
//!     let reconciler = Arc::new(ReconcilerBuilder::new().with_backend(registry).build()?);
//!
//!     let desired = Arc::new(InMemoryDesiredStateProvider::new(BTreeMap::from([
//!         ("kitchen".to_string(), 43),
//!     ])));
//!
//!     let report = ReconciliationLoop::new(reconciler, desired, LoopConfig::default())
//!         .run_until_settled()
//!         .await?;
//!     println!("{report:?}");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod r#loop;
pub mod reconciler;
pub mod types;

// Re-export main types
pub use error::{Error, Result};
pub use r#loop::{
    DesiredStateProvider, InMemoryDesiredStateProvider, LoopConfig, LoopStopper,
    ReconciliationLoop,
};
pub use reconciler::{ReconcilerBuilder, ReconcilerConfig, ShutterBackend, ShutterReconciler};
pub use types::{
    LoopReport, Observation, ReconcileOutcome, ReconcileReport, ShutterPhase, ShutterStatus,
};
