//! State store trait and implementations.
//!
//! Shutter and light state survives restarts as two JSON arrays. Reads happen
//! once at startup and writes once at shutdown; nothing in the convergence
//! path touches the store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::Error;
use crate::result::Result;
use crate::state::{ActuatorState, LightState};

const SHUTTERS_FILE: &str = "shutters.json";
const LIGHTS_FILE: &str = "lights.json";

/// Trait for state storage backends.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read persisted shutters. An absent store yields an empty list.
    async fn load_shutters(&self) -> Result<Vec<ActuatorState>>;

    /// Replace persisted shutters.
    async fn save_shutters(&self, shutters: &[ActuatorState]) -> Result<()>;

    /// Read persisted lights. An absent store yields an empty list.
    async fn load_lights(&self) -> Result<Vec<LightState>>;

    /// Replace persisted lights.
    async fn save_lights(&self, lights: &[LightState]) -> Result<()>;
}

/// Stores state as JSON files in one directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn read_records<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>> {
        let path = self.dir.join(file);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No persisted state");
                return Ok(Vec::new());
            }
            Err(e) => return Err(Error::file_read_failed(&path, e.to_string())),
        };

        serde_json::from_str(&content)
            .map_err(|e| Error::json_parse_failed(format!("{}: {e}", path.display())))
    }

    async fn write_records<T: Serialize + Sync>(&self, file: &str, records: &[T]) -> Result<()> {
        let path = self.dir.join(file);
        let json = serde_json::to_string_pretty(records)
            .map_err(|e| Error::json_parse_failed(e.to_string()))?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| Error::file_write_failed(&self.dir, e.to_string()))?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| Error::file_write_failed(&path, e.to_string()))?;

        debug!(path = %path.display(), count = records.len(), "State saved");
        Ok(())
    }
}

#[async_trait]
impl StateStore for JsonFileStore {
    async fn load_shutters(&self) -> Result<Vec<ActuatorState>> {
        self.read_records(SHUTTERS_FILE).await
    }

    async fn save_shutters(&self, shutters: &[ActuatorState]) -> Result<()> {
        self.write_records(SHUTTERS_FILE, shutters).await
    }

    async fn load_lights(&self) -> Result<Vec<LightState>> {
        self.read_records(LIGHTS_FILE).await
    }

    async fn save_lights(&self, lights: &[LightState]) -> Result<()> {
        self.write_records(LIGHTS_FILE, lights).await
    }
}

/// In-memory state store for testing.
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    shutters: RwLock<Vec<ActuatorState>>,
    lights: RwLock<Vec<LightState>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `shutters`.
    pub fn with_shutters(shutters: Vec<ActuatorState>) -> Self {
        Self {
            shutters: RwLock::new(shutters),
            lights: RwLock::default(),
        }
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn load_shutters(&self) -> Result<Vec<ActuatorState>> {
        Ok(self.shutters.read().await.clone())
    }

    async fn save_shutters(&self, shutters: &[ActuatorState]) -> Result<()> {
        *self.shutters.write().await = shutters.to_vec();
        Ok(())
    }

    async fn load_lights(&self) -> Result<Vec<LightState>> {
        Ok(self.lights.read().await.clone())
    }

    async fn save_lights(&self, lights: &[LightState]) -> Result<()> {
        *self.lights.write().await = lights.to_vec();
        Ok(())
    }
}
