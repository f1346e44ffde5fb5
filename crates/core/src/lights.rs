//! Lights switch instantly, so they need no worker: a locked map is enough.

use std::collections::BTreeMap;

use tokio::sync::RwLock;
use tracing::debug;

use crate::state::LightState;

/// Owns every light, one per name. Unknown lights start switched off.
#[derive(Debug, Default)]
pub struct LightRegistry {
    lights: RwLock<BTreeMap<String, bool>>,
}

impl LightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rehydrate from persisted records.
    pub fn with_seed(records: &[LightState]) -> Self {
        Self {
            lights: RwLock::new(
                records
                    .iter()
                    .map(|light| (light.name.clone(), light.on))
                    .collect(),
            ),
        }
    }

    pub async fn switch(&self, name: &str, on: bool) {
        self.lights.write().await.insert(name.to_string(), on);
        debug!(light = %name, on, "Light switched");
    }

    pub async fn get(&self, name: &str) -> LightState {
        let on = *self
            .lights
            .write()
            .await
            .entry(name.to_string())
            .or_insert(false);
        LightState {
            name: name.to_string(),
            on,
        }
    }

    /// Every light, sorted by name.
    pub async fn list(&self) -> Vec<LightState> {
        self.lights
            .read()
            .await
            .iter()
            .map(|(name, on)| LightState {
                name: name.clone(),
                on: *on,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_light_is_off_and_registered() {
        let lights = LightRegistry::new();
        assert!(!lights.get("porch").await.on);
        assert_eq!(lights.list().await.len(), 1);
    }

    #[tokio::test]
    async fn test_switch_and_list_sorted() {
        let lights = LightRegistry::with_seed(&[LightState {
            name: "porch".into(),
            on: true,
        }]);
        lights.switch("desk", true).await;
        lights.switch("porch", false).await;

        let listed = lights.list().await;
        assert_eq!(
            listed,
            vec![
                LightState { name: "desk".into(), on: true },
                LightState { name: "porch".into(), on: false },
            ]
        );
    }
}
