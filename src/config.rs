//! Application configuration.
//!
//! Values come from, in increasing precedence: built-in defaults, the config
//! file, `SMARTHOME_*` environment variables, and command-line flags.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use smarthome_core::ActuatorConfig;
use smarthome_reconciler::ReconcilerConfig;

/// Where state lives unless configured otherwise.
pub const DEFAULT_STATE_DIR: &str = "/tmp/smarthome";

const ENV_STATE_DIR: &str = "SMARTHOME_STATE_DIR";
const ENV_TICK_MS: &str = "SMARTHOME_TICK_MS";
const ENV_MAX_STEP: &str = "SMARTHOME_MAX_STEP";

/// Top-level configuration of the `smarthome` binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding `shutters.json` and `lights.json`.
    pub state_dir: PathBuf,
    pub actuator: ActuatorConfig,
    pub reconciler: ReconcilerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            actuator: ActuatorConfig::default(),
            reconciler: ReconcilerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a file.
    ///
    /// Files ending in `.json` are read as JSON, everything else as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;

        if path.extension().is_some_and(|e| e == "json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config {}", path.display()))
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config {}", path.display()))
        }
    }

    /// Resolve the effective configuration from an optional file and the
    /// process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is unreadable, an override does not
    /// parse, or the resulting actuator settings are invalid.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = path.map_or_else(|| Ok(Self::default()), Self::from_file)?;
        let config = config.with_overrides(|key| std::env::var(key).ok())?;
        config.actuator.validate()?;
        Ok(config)
    }

    /// Apply `SMARTHOME_*` overrides looked up through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric override does not parse.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(dir) = lookup(ENV_STATE_DIR) {
            self.state_dir = PathBuf::from(dir);
        }

        if let Some(value) = lookup(ENV_TICK_MS) {
            let millis = value
                .trim()
                .parse::<u64>()
                .with_context(|| format!("{ENV_TICK_MS} must be milliseconds, got {value:?}"))?;
            self.actuator.tick_interval = Duration::from_millis(millis);
        }

        if let Some(value) = lookup(ENV_MAX_STEP) {
            self.actuator.max_step = value
                .trim()
                .parse::<u8>()
                .with_context(|| format!("{ENV_MAX_STEP} must be 1-255, got {value:?}"))?;
        }

        Ok(self)
    }

    /// Replace the state directory when one was given on the command line.
    #[must_use]
    pub fn with_state_dir(mut self, state_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = state_dir {
            self.state_dir = dir;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use std::collections::HashMap;

    use smarthome_core::RetargetPolicy;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_match_reference_timing() {
        let config = AppConfig::default();
        assert_eq!(config.state_dir, PathBuf::from("/tmp/smarthome"));
        assert_eq!(config.actuator.tick_interval, Duration::from_secs(1));
        assert_eq!(config.actuator.max_step, 9);
        assert_eq!(config.reconciler.requeue_after, Duration::from_secs(1));
    }

    #[test]
    fn test_toml_fills_missing_keys_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("smarthome.toml");
        std::fs::write(
            &path,
            r#"
state_dir = "/var/lib/smarthome"

[actuator]
tick_interval_ms = 250
retarget = "interrupt"
"#,
        )
        .unwrap();

        let config = AppConfig::from_file(&path).unwrap();

        assert_eq!(config.state_dir, PathBuf::from("/var/lib/smarthome"));
        assert_eq!(config.actuator.tick_interval, Duration::from_millis(250));
        assert_eq!(config.actuator.retarget, RetargetPolicy::Interrupt);
        assert_eq!(config.actuator.max_step, 9);
        assert_eq!(config.reconciler, ReconcilerConfig::default());
    }

    #[test]
    fn test_json_selected_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("smarthome.json");
        std::fs::write(&path, r#"{"reconciler": {"requeue_after_ms": 100}}"#).unwrap();

        let config = AppConfig::from_file(&path).unwrap();

        assert_eq!(config.reconciler.requeue_after, Duration::from_millis(100));
        assert_eq!(config.actuator, ActuatorConfig::default());
    }

    #[test]
    fn test_env_overrides_file_values() {
        let config = AppConfig::default()
            .with_overrides(env(&[
                ("SMARTHOME_STATE_DIR", "/srv/home"),
                ("SMARTHOME_TICK_MS", "20"),
                ("SMARTHOME_MAX_STEP", " 5 "),
            ]))
            .unwrap();

        assert_eq!(config.state_dir, PathBuf::from("/srv/home"));
        assert_eq!(config.actuator.tick_interval, Duration::from_millis(20));
        assert_eq!(config.actuator.max_step, 5);
    }

    #[test]
    fn test_bad_env_override_is_error() {
        let result = AppConfig::default().with_overrides(env(&[("SMARTHOME_MAX_STEP", "fast")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_flag_wins_over_config() {
        let config = AppConfig::default().with_state_dir(Some(PathBuf::from("/flag")));
        assert_eq!(config.state_dir, PathBuf::from("/flag"));

        let config = AppConfig::default().with_state_dir(None);
        assert_eq!(config.state_dir, PathBuf::from(DEFAULT_STATE_DIR));
    }
}
