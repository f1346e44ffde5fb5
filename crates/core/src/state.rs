//! Plain value types describing device state.
//!
//! Field names serialize in `PascalCase` so persisted files keep the
//! `{"Name","Target","Current","Moving"}` record shape.

use serde::{Deserialize, Serialize};

/// Point-in-time view of one shutter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ActuatorState {
    pub name: String,
    /// Percentage closed right now.
    pub current: u8,
    /// Most recently accepted request.
    pub target: u8,
    #[serde(default)]
    pub moving: bool,
}

impl ActuatorState {
    /// A resting shutter at `position`.
    pub fn at_rest(name: impl Into<String>, position: u8) -> Self {
        Self {
            name: name.into(),
            current: position,
            target: position,
            moving: false,
        }
    }

    #[must_use]
    pub const fn is_converged(&self) -> bool {
        self.current == self.target
    }
}

/// Point-in-time view of one light.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LightState {
    pub name: String,
    pub on: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_shape_is_pascal_case() {
        let state = ActuatorState::at_rest("kitchen", 43);
        let json = serde_json::to_string(&state).unwrap_or_default();
        assert_eq!(
            json,
            r#"{"Name":"kitchen","Current":43,"Target":43,"Moving":false}"#
        );
    }

    #[test]
    fn test_moving_defaults_when_absent() {
        let parsed: Result<ActuatorState, _> =
            serde_json::from_str(r#"{"Name":"hall","Current":10,"Target":20}"#);
        assert!(parsed.as_ref().is_ok_and(|s| !s.moving && !s.is_converged()));
    }
}
