//! Reconciler implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use smarthome_core::config::duration_millis;
use smarthome_core::{ActuatorRegistry, ActuatorState, Percentage};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::types::{Observation, ReconcileOutcome};

/// Configuration for the reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Delay before checking a shutter that is still moving.
    #[serde(rename = "requeue_after_ms", with = "duration_millis", default = "default_requeue_after")]
    pub requeue_after: Duration,
    /// Delay before retrying after a retryable failure.
    #[serde(rename = "error_backoff_ms", with = "duration_millis", default = "default_error_backoff")]
    pub error_backoff: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            requeue_after: default_requeue_after(),
            error_backoff: default_error_backoff(),
        }
    }
}

const fn default_requeue_after() -> Duration {
    Duration::from_secs(1)
}

const fn default_error_backoff() -> Duration {
    Duration::from_secs(5)
}

/// Trait for the shutters a reconciler drives.
#[async_trait]
pub trait ShutterBackend: Send + Sync {
    /// Queue a new target for the named shutter.
    async fn set_target(&self, name: &str, target: Percentage) -> smarthome_core::Result<()>;

    /// Read the named shutter's current state.
    async fn snapshot(&self, name: &str) -> smarthome_core::Result<ActuatorState>;

    /// Number of targets queued for the named shutter and not yet accepted.
    async fn pending(&self, name: &str) -> smarthome_core::Result<usize>;
}

#[async_trait]
impl ShutterBackend for ActuatorRegistry {
    async fn set_target(&self, name: &str, target: Percentage) -> smarthome_core::Result<()> {
        self.get_or_create(name).await.request(target).await
    }

    /// Unknown shutters read as fully open without being created.
    async fn snapshot(&self, name: &str) -> smarthome_core::Result<ActuatorState> {
        Ok(match self.get(name).await {
            Some(actuator) => actuator.snapshot().await,
            None => ActuatorState::at_rest(name, Percentage::OPEN.value()),
        })
    }

    async fn pending(&self, name: &str) -> smarthome_core::Result<usize> {
        Ok(match self.get(name).await {
            Some(actuator) => actuator.pending().await,
            None => 0,
        })
    }
}

/// K8s-style reconciler for shutter positions.
///
/// One call issues the desired target and reports what the shutter looks
/// like right afterwards. It never waits for the move to finish; the caller
/// owns scheduling and calls again when told to requeue.
pub struct ShutterReconciler {
    backend: Arc<dyn ShutterBackend>,
    config: ReconcilerConfig,
}

impl ShutterReconciler {
    /// Create a new reconciler.
    pub fn new(backend: Arc<dyn ShutterBackend>, config: ReconcilerConfig) -> Self {
        Self { backend, config }
    }

    /// Drive `name` toward `desired` percent closed.
    ///
    /// The target is only issued when the shutter has already accepted it
    /// and nothing else is queued behind it, so requeued calls do not pile
    /// duplicate commands onto the queue. The shutter counts as converged
    /// once it rests at `desired` with an empty queue; any target still
    /// waiting in the queue keeps the outcome at requeue.
    pub async fn reconcile(&self, name: &str, desired: i64) -> ReconcileOutcome {
        let target = match Percentage::new(desired) {
            Ok(target) => target,
            Err(e) => {
                warn!(shutter = %name, desired, error = %e, "Rejecting desired position");
                return ReconcileOutcome::Rejected { error: e.into() };
            }
        };

        let (pending, before) = match self.observe(name).await {
            Ok(observed) => observed,
            Err(e) => return self.failed(name, e, "checking shutter state"),
        };

        let (pending, observation) = if pending == 0 && before.target == target.value() {
            (pending, Observation::now(before))
        } else {
            if let Err(e) = self.backend.set_target(name, target).await {
                return self.failed(name, e.into(), "updating shutter");
            }
            match self.observe(name).await {
                Ok((pending, state)) => (pending, Observation::now(state)),
                Err(e) => return self.failed(name, e, "checking shutter state"),
            }
        };

        let state = &observation.state;
        if pending == 0 && state.is_converged() && state.target == target.value() {
            info!(shutter = %name, position = state.current, "Shutter in position");
            ReconcileOutcome::Converged { observation }
        } else {
            debug!(
                shutter = %name,
                current = state.current,
                target = state.target,
                desired = target.value(),
                pending,
                phase = %observation.phase(),
                "Shutter converging, requeue"
            );
            ReconcileOutcome::Requeue {
                observation,
                after: self.config.requeue_after,
            }
        }
    }

    /// Queue length, then state.
    ///
    /// Read in this order, an empty queue means the snapshot already reflects
    /// every target queued before the call.
    async fn observe(&self, name: &str) -> Result<(usize, ActuatorState)> {
        let pending = self.backend.pending(name).await?;
        let state = self.backend.snapshot(name).await?;
        Ok((pending, state))
    }

    fn failed(&self, name: &str, error: Error, stage: &str) -> ReconcileOutcome {
        if error.is_retryable() {
            warn!(shutter = %name, error = %error, "{stage} failed, will retry");
            ReconcileOutcome::Retry {
                error,
                after: self.config.error_backoff,
            }
        } else {
            warn!(shutter = %name, error = %error, "{stage} failed permanently");
            ReconcileOutcome::Rejected { error }
        }
    }

    /// Get the configuration.
    pub const fn config(&self) -> &ReconcilerConfig {
        &self.config
    }
}

/// Builder for ShutterReconciler.
#[derive(Default)]
pub struct ReconcilerBuilder {
    backend: Option<Arc<dyn ShutterBackend>>,
    config: ReconcilerConfig,
}

impl ReconcilerBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the shutter backend.
    #[must_use]
    pub fn with_backend(mut self, backend: Arc<dyn ShutterBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ReconcilerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the requeue delay for moving shutters.
    #[must_use]
    pub const fn requeue_after(mut self, after: Duration) -> Self {
        self.config.requeue_after = after;
        self
    }

    /// Build the reconciler.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] when no backend was set.
    pub fn build(self) -> Result<ShutterReconciler> {
        let backend = self
            .backend
            .ok_or_else(|| Error::invalid_config("Shutter backend is required"))?;

        Ok(ShutterReconciler::new(backend, self.config))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use smarthome_core::ActuatorConfig;

    use super::*;

    fn setup_reconciler() -> (ShutterReconciler, Arc<ActuatorRegistry>) {
        let registry = Arc::new(
            ActuatorRegistry::new(ActuatorConfig::default().tick_interval(Duration::ZERO)).unwrap(),
        );
        let reconciler = ReconcilerBuilder::new()
            .with_backend(registry.clone())
            .build()
            .unwrap();
        (reconciler, registry)
    }

    #[tokio::test]
    async fn test_invalid_desired_creates_no_shutter() {
        let (reconciler, registry) = setup_reconciler();

        let outcome = reconciler.reconcile("kitchen", 150).await;

        assert!(matches!(outcome, ReconcileOutcome::Rejected { .. }));
        assert!(!outcome.requeue());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_reconcile_at_rest_converges() {
        let (reconciler, _) = setup_reconciler();

        let outcome = reconciler.reconcile("hall", 0).await;

        assert!(matches!(outcome, ReconcileOutcome::Converged { .. }));
        assert_eq!(outcome.requeue_after(), None);
    }

    #[tokio::test]
    async fn test_snapshot_of_unknown_shutter_creates_nothing() {
        let (_, registry) = setup_reconciler();
        registry.close().await;

        let state = registry.snapshot("cellar").await.unwrap();

        assert_eq!(state, ActuatorState::at_rest("cellar", 0));
        assert_eq!(registry.pending("cellar").await.unwrap(), 0);
        assert!(registry.is_empty().await);
    }

    #[test]
    fn test_builder_requires_backend() {
        let result = ReconcilerBuilder::new()
            .requeue_after(Duration::from_millis(200))
            .build();
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_config_from_millis() {
        let parsed: std::result::Result<ReconcilerConfig, _> =
            serde_json::from_str(r#"{"requeue_after_ms": 250}"#);
        let config = parsed.unwrap();
        assert_eq!(config.requeue_after, Duration::from_millis(250));
        assert_eq!(config.error_backoff, Duration::from_secs(5));
    }
}
