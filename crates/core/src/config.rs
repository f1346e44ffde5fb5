//! Actuator rate and queue configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::result::Result;

/// Default pause between two position steps.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Default largest position change per tick. Moving more than 10% per
/// second would destroy the shutter, and the window with it.
pub const DEFAULT_MAX_STEP: u8 = 9;

/// Default command queue depth per actuator.
pub const DEFAULT_QUEUE_DEPTH: usize = 10;

/// What the worker does with a target that arrives mid-move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetargetPolicy {
    /// Finish the current move, then pick up the next queued target.
    #[default]
    CompleteFirst,
    /// Check the queue after every tick and adopt the next target at once.
    Interrupt,
}

/// Configuration shared by every actuator of a registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActuatorConfig {
    #[serde(
        rename = "tick_interval_ms",
        with = "duration_millis",
        default = "default_tick_interval"
    )]
    pub tick_interval: Duration,

    #[serde(default = "default_max_step")]
    pub max_step: u8,

    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,

    #[serde(default)]
    pub retarget: RetargetPolicy,
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            max_step: DEFAULT_MAX_STEP,
            queue_depth: DEFAULT_QUEUE_DEPTH,
            retarget: RetargetPolicy::default(),
        }
    }
}

impl ActuatorConfig {
    /// Set the tick interval.
    #[must_use]
    pub const fn tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    /// Set the per-tick step cap.
    #[must_use]
    pub const fn max_step(mut self, max_step: u8) -> Self {
        self.max_step = max_step;
        self
    }

    /// Set the command queue depth.
    #[must_use]
    pub const fn queue_depth(mut self, queue_depth: usize) -> Self {
        self.queue_depth = queue_depth;
        self
    }

    /// Set the retarget policy.
    #[must_use]
    pub const fn retarget(mut self, retarget: RetargetPolicy) -> Self {
        self.retarget = retarget;
        self
    }

    /// Check the values a worker cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for a zero step cap (the shutter would
    /// never arrive) or a zero queue depth.
    pub fn validate(&self) -> Result<()> {
        if self.max_step == 0 {
            return Err(Error::invalid_config("max_step must be at least 1"));
        }
        if self.queue_depth == 0 {
            return Err(Error::invalid_config("queue_depth must be at least 1"));
        }
        Ok(())
    }
}

const fn default_tick_interval() -> Duration {
    DEFAULT_TICK_INTERVAL
}

const fn default_max_step() -> u8 {
    DEFAULT_MAX_STEP
}

const fn default_queue_depth() -> usize {
    DEFAULT_QUEUE_DEPTH
}

/// Serialization helper for Duration as milliseconds.
pub mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_device_limits() {
        let config = ActuatorConfig::default();
        assert_eq!(config.tick_interval, Duration::from_secs(1));
        assert_eq!(config.max_step, 9);
        assert_eq!(config.queue_depth, 10);
        assert_eq!(config.retarget, RetargetPolicy::CompleteFirst);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_step_rejected() {
        let config = ActuatorConfig::default().max_step(0);
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_toml_partial_fills_defaults() {
        let parsed: std::result::Result<ActuatorConfig, _> =
            toml::from_str("tick_interval_ms = 250\nretarget = \"interrupt\"\n");
        let config = parsed.unwrap_or_default();
        assert_eq!(config.tick_interval, Duration::from_millis(250));
        assert_eq!(config.retarget, RetargetPolicy::Interrupt);
        assert_eq!(config.max_step, DEFAULT_MAX_STEP);
    }
}
