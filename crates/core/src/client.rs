//! Smart home facade: both device registries plus their persistence.

use std::sync::Arc;

use tracing::info;

use crate::config::ActuatorConfig;
use crate::lights::LightRegistry;
use crate::persistence::StateStore;
use crate::registry::ActuatorRegistry;
use crate::result::{Result, ResultExt};

/// Entry point for callers that drive shutters and lights.
pub struct SmartHomeClient {
    shutters: Arc<ActuatorRegistry>,
    lights: LightRegistry,
    store: Arc<dyn StateStore>,
}

impl SmartHomeClient {
    /// Open the home, seeding device state from `store`.
    ///
    /// A store that cannot be read is logged and treated as empty.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidConfig`] if `config` fails validation.
    pub async fn open(config: ActuatorConfig, store: Arc<dyn StateStore>) -> Result<Self> {
        let shutters = store
            .load_shutters()
            .await
            .or_default_logged(Vec::new(), "Failed to load shutters");
        let lights = store
            .load_lights()
            .await
            .or_default_logged(Vec::new(), "Failed to load lights");

        Ok(Self {
            shutters: Arc::new(ActuatorRegistry::with_seed(config, &shutters)?),
            lights: LightRegistry::with_seed(&lights),
            store,
        })
    }

    pub fn shutters(&self) -> &Arc<ActuatorRegistry> {
        &self.shutters
    }

    pub const fn lights(&self) -> &LightRegistry {
        &self.lights
    }

    /// Stop every shutter, wait for queued moves to finish, then persist.
    ///
    /// Save failures are logged, never returned.
    pub async fn close(&self) {
        self.shutters.close().await;

        let shutters = self.shutters.list().await;
        self.store
            .save_shutters(&shutters)
            .await
            .log_failure("Failed to save shutters");

        let lights = self.lights.list().await;
        self.store
            .save_lights(&lights)
            .await
            .log_failure("Failed to save lights");

        info!(
            shutters = shutters.len(),
            lights = lights.len(),
            "Smart home closed"
        );
    }
}
