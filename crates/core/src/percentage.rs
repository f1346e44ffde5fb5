//! Validated closed-percentage values.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A closed percentage in `0..=100`.
///
/// Values outside the range are rejected at construction, so anything
/// holding a `Percentage` can hand it to an actuator without re-checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Percentage(u8);

impl Percentage {
    /// Fully open.
    pub const OPEN: Self = Self(0);
    /// Fully closed.
    pub const CLOSED: Self = Self(100);

    /// Validate a raw caller-supplied value.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming the violated bound.
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if value > 100 {
            return Err(ValidationError::AboveMaximum { value });
        }
        u8::try_from(value)
            .map(Self)
            .map_err(|_| ValidationError::BelowMinimum { value })
    }

    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Percentage {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Percentage> for u8 {
    fn from(p: Percentage) -> Self {
        p.0
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl<'de> Deserialize<'de> for Percentage {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}
