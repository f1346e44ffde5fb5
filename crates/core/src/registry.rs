//! Name → actuator map with race-free lazy creation.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use itertools::Itertools;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::actuator::Actuator;
use crate::config::ActuatorConfig;
use crate::percentage::Percentage;
use crate::result::Result;
use crate::state::ActuatorState;

/// Owns every shutter actuator, one per name.
#[derive(Debug)]
pub struct ActuatorRegistry {
    config: ActuatorConfig,
    actuators: RwLock<HashMap<String, Arc<Actuator>>>,
}

impl ActuatorRegistry {
    /// Create an empty registry.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidConfig`] if `config` fails validation.
    pub fn new(config: ActuatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            actuators: RwLock::new(HashMap::new()),
        })
    }

    /// Create a registry rehydrated from persisted records.
    ///
    /// Each record seeds one actuator at rest at its `current` position.
    /// Records with an out-of-range position are skipped. When a name
    /// repeats, the last record wins.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidConfig`] if `config` fails validation.
    pub fn with_seed(config: ActuatorConfig, records: &[ActuatorState]) -> Result<Self> {
        config.validate()?;

        let mut actuators = HashMap::with_capacity(records.len());
        for record in records {
            let position = match Percentage::new(i64::from(record.current)) {
                Ok(position) => position,
                Err(e) => {
                    warn!(shutter = %record.name, error = %e, "Skipping persisted shutter");
                    continue;
                }
            };

            let actuator = Arc::new(Actuator::spawn_at(record.name.as_str(), &config, position));
            if actuators.insert(record.name.clone(), actuator).is_some() {
                warn!(shutter = %record.name, "Duplicate persisted shutter, keeping the last record");
            }
        }

        info!(count = actuators.len(), "Shutters restored");

        Ok(Self {
            config,
            actuators: RwLock::new(actuators),
        })
    }

    pub const fn config(&self) -> &ActuatorConfig {
        &self.config
    }

    /// Return the actuator for `name`, creating it on first reference.
    ///
    /// Concurrent first calls for the same name get the same actuator.
    pub async fn get_or_create(&self, name: &str) -> Arc<Actuator> {
        if let Some(actuator) = self.actuators.read().await.get(name) {
            return Arc::clone(actuator);
        }

        let mut actuators = self.actuators.write().await;
        let actuator = actuators.entry(name.to_string()).or_insert_with(|| {
            debug!(shutter = %name, "Creating actuator");
            Arc::new(Actuator::spawn(name, &self.config))
        });
        Arc::clone(actuator)
    }

    /// Return the actuator for `name` without creating it.
    pub async fn get(&self, name: &str) -> Option<Arc<Actuator>> {
        self.actuators.read().await.get(name).cloned()
    }

    /// Snapshots of every actuator, sorted by name.
    pub async fn list(&self) -> Vec<ActuatorState> {
        let actuators = self
            .actuators
            .read()
            .await
            .values()
            .cloned()
            .collect_vec();

        join_all(actuators.iter().map(|a| a.snapshot()))
            .await
            .into_iter()
            .sorted_by(|a, b| a.name.cmp(&b.name))
            .collect_vec()
    }

    pub async fn len(&self) -> usize {
        self.actuators.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.actuators.read().await.is_empty()
    }

    /// Shut every actuator down and wait for their workers to drain.
    pub async fn close(&self) {
        let actuators = self
            .actuators
            .read()
            .await
            .values()
            .cloned()
            .collect_vec();

        join_all(actuators.iter().map(|a| a.shutdown())).await;
        join_all(actuators.iter().map(|a| a.stopped())).await;

        info!(count = actuators.len(), "All shutters stopped");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::Error;

    fn registry() -> ActuatorRegistry {
        ActuatorRegistry::new(ActuatorConfig::default().tick_interval(Duration::ZERO)).unwrap()
    }

    #[tokio::test]
    async fn test_get_or_create_returns_same_actuator() {
        let registry = registry();
        let first = registry.get_or_create("kitchen").await;
        let second = registry.get_or_create("kitchen").await;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_new_actuator_starts_open() {
        let registry = registry();
        let state = registry.get_or_create("hall").await.snapshot().await;
        assert_eq!(state, ActuatorState::at_rest("hall", 0));
    }

    #[tokio::test]
    async fn test_list_sorted_by_name() {
        let registry = registry();
        for name in ["living", "bath", "kitchen"] {
            registry.get_or_create(name).await;
        }

        let names = registry.list().await.into_iter().map(|s| s.name).collect_vec();
        assert_eq!(names, vec!["bath", "kitchen", "living"]);
    }

    #[tokio::test]
    async fn test_seed_rests_at_persisted_position() {
        let records = vec![
            ActuatorState {
                name: "attic".into(),
                current: 55,
                target: 80,
                moving: true,
            },
            ActuatorState::at_rest("broken", 240),
        ];
        let registry =
            ActuatorRegistry::with_seed(ActuatorConfig::default(), &records).unwrap();

        assert_eq!(registry.list().await, vec![ActuatorState::at_rest("attic", 55)]);
    }

    #[tokio::test]
    async fn test_seed_duplicate_name_keeps_last_record() {
        let records = vec![
            ActuatorState::at_rest("attic", 20),
            ActuatorState::at_rest("attic", 65),
        ];
        let registry =
            ActuatorRegistry::with_seed(ActuatorConfig::default(), &records).unwrap();

        assert_eq!(registry.len().await, 1);
        assert_eq!(registry.list().await, vec![ActuatorState::at_rest("attic", 65)]);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let result = ActuatorRegistry::new(ActuatorConfig::default().queue_depth(0));
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[tokio::test]
    async fn test_close_stops_all_actuators() {
        let registry = registry();
        let kitchen = registry.get_or_create("kitchen").await;
        registry.get_or_create("hall").await;

        registry.close().await;

        assert!(matches!(
            kitchen.set_target(50).await,
            Err(Error::QueueClosed { .. })
        ));
    }
}
