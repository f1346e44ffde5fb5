//! Core types for the reconciler.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smarthome_core::ActuatorState;

use crate::error::Error;

/// Coarse shutter phase, as published in a shutter's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShutterPhase {
    Moving,
    Idle,
}

impl std::fmt::Display for ShutterPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Moving => write!(f, "Moving"),
            Self::Idle => write!(f, "Idle"),
        }
    }
}

/// Observed status written back for the declaring resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShutterStatus {
    pub phase: ShutterPhase,
    pub closed_percentage: u8,
    pub observed_at: DateTime<Utc>,
}

/// Actuator state read back right after issuing a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub state: ActuatorState,
    pub observed_at: DateTime<Utc>,
}

impl Observation {
    pub fn now(state: ActuatorState) -> Self {
        Self {
            state,
            observed_at: Utc::now(),
        }
    }

    pub const fn phase(&self) -> ShutterPhase {
        if self.state.moving {
            ShutterPhase::Moving
        } else {
            ShutterPhase::Idle
        }
    }

    pub fn status(&self) -> ShutterStatus {
        ShutterStatus {
            phase: self.phase(),
            closed_percentage: self.state.current,
            observed_at: self.observed_at,
        }
    }
}

/// Result of one reconcile call.
#[derive(Debug)]
pub enum ReconcileOutcome {
    /// The shutter is at the desired position; nothing more to do.
    Converged { observation: Observation },
    /// Still moving; call again after `after`.
    Requeue {
        observation: Observation,
        after: Duration,
    },
    /// The request could not be delivered; call again after `after`.
    Retry { error: Error, after: Duration },
    /// The request can never succeed; report it and do not call again.
    Rejected { error: Error },
}

impl ReconcileOutcome {
    /// Whether the caller should reconcile this shutter again.
    pub const fn requeue(&self) -> bool {
        matches!(self, Self::Requeue { .. } | Self::Retry { .. })
    }

    /// How long the caller should wait before the next attempt.
    pub const fn requeue_after(&self) -> Option<Duration> {
        match self {
            Self::Requeue { after, .. } | Self::Retry { after, .. } => Some(*after),
            Self::Converged { .. } | Self::Rejected { .. } => None,
        }
    }

    pub const fn observation(&self) -> Option<&Observation> {
        match self {
            Self::Converged { observation } | Self::Requeue { observation, .. } => {
                Some(observation)
            }
            Self::Retry { .. } | Self::Rejected { .. } => None,
        }
    }

    pub const fn error(&self) -> Option<&Error> {
        match self {
            Self::Retry { error, .. } | Self::Rejected { error } => Some(error),
            Self::Converged { .. } | Self::Requeue { .. } => None,
        }
    }

    /// Flat view for callers that only speak plain values.
    pub fn report(&self) -> ReconcileReport {
        let state = self.observation().map(|o| &o.state);
        ReconcileReport {
            observed_current: state.map(|s| s.current),
            observed_target: state.map(|s| s.target),
            moving: state.is_some_and(|s| s.moving),
            requeue: self.requeue(),
            error: self.error().map(ToString::to_string),
        }
    }
}

/// Plain-value reconcile result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub observed_current: Option<u8>,
    pub observed_target: Option<u8>,
    pub moving: bool,
    pub requeue: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summary of a reconciliation loop run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoopReport {
    /// Number of passes over the desired state.
    pub passes: usize,
    /// Latest result per shutter.
    pub outcomes: BTreeMap<String, ReconcileReport>,
    /// Whether the loop was stopped before everything settled.
    pub stopped: bool,
}

impl LoopReport {
    /// Shutters whose request was rejected, with the reason.
    pub fn rejected(&self) -> impl Iterator<Item = (&str, &str)> {
        self.outcomes.iter().filter_map(|(name, report)| {
            report
                .error
                .as_deref()
                .filter(|_| !report.requeue)
                .map(|error| (name.as_str(), error))
        })
    }

    /// Whether every shutter reached its desired position.
    pub fn all_converged(&self) -> bool {
        !self.stopped
            && self
                .outcomes
                .values()
                .all(|r| r.error.is_none() && !r.requeue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moving_state() -> ActuatorState {
        ActuatorState {
            name: "kitchen".into(),
            current: 9,
            target: 50,
            moving: true,
        }
    }

    #[test]
    fn test_phase_follows_moving_flag() {
        assert_eq!(Observation::now(moving_state()).phase(), ShutterPhase::Moving);
        let idle = ActuatorState::at_rest("kitchen", 50);
        assert_eq!(Observation::now(idle).phase(), ShutterPhase::Idle);
    }

    #[test]
    fn test_requeue_report_carries_observation() {
        let outcome = ReconcileOutcome::Requeue {
            observation: Observation::now(moving_state()),
            after: Duration::from_secs(1),
        };

        let report = outcome.report();
        assert_eq!(report.observed_current, Some(9));
        assert_eq!(report.observed_target, Some(50));
        assert!(report.moving);
        assert!(report.requeue);
        assert!(report.error.is_none());
    }

    #[test]
    fn test_rejected_report_is_terminal() {
        let outcome = ReconcileOutcome::Rejected {
            error: smarthome_core::ValidationError::BelowMinimum { value: -5 }.into(),
        };

        let report = outcome.report();
        assert!(!report.requeue);
        assert_eq!(report.observed_current, None);
        assert!(report.error.is_some_and(|e| e.contains("0% closed")));
    }

    #[test]
    fn test_status_uses_crd_field_names() {
        let status = Observation::now(moving_state()).status();
        let json = serde_json::to_value(&status).unwrap_or_default();
        assert_eq!(json["phase"], "Moving");
        assert_eq!(json["closedPercentage"], 9);
    }
}
