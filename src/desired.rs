//! Desired-state files for `smarthome apply`.
//!
//! ```toml
//! [shutters]
//! kitchen = 43
//! bedroom = 100
//!
//! [lights]
//! porch = true
//! ```
//!
//! Shutter values are kept as written; out-of-range positions are rejected
//! per shutter during reconciliation, not while parsing the file.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Declared shutter positions and light switches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DesiredState {
    /// Closed percentage per shutter name.
    #[serde(default)]
    pub shutters: BTreeMap<String, i64>,
    /// On/off per light name.
    #[serde(default)]
    pub lights: BTreeMap<String, bool>,
}

impl DesiredState {
    /// Parse a TOML desired-state document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid TOML or has unknown
    /// sections.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid desired-state file")
    }

    /// Read and parse a desired-state file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("In {}", path.display()))
    }

    pub fn is_empty(&self) -> bool {
        self.shutters.is_empty() && self.lights.is_empty()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_parse_shutters_and_lights() {
        let desired = DesiredState::parse(
            r"
[shutters]
kitchen = 43
bedroom = 100

[lights]
porch = true
",
        )
        .unwrap();

        assert_eq!(desired.shutters.get("kitchen"), Some(&43));
        assert_eq!(desired.shutters.get("bedroom"), Some(&100));
        assert_eq!(desired.lights.get("porch"), Some(&true));
    }

    #[test]
    fn test_out_of_range_values_survive_parsing() {
        let desired = DesiredState::parse("[shutters]\nattic = 150\ncellar = -3\n").unwrap();
        assert_eq!(desired.shutters.get("attic"), Some(&150));
        assert_eq!(desired.shutters.get("cellar"), Some(&-3));
        assert!(desired.lights.is_empty());
    }

    #[test]
    fn test_empty_document_is_empty() {
        assert!(DesiredState::parse("").unwrap().is_empty());
    }

    #[test]
    fn test_unknown_section_rejected() {
        assert!(DesiredState::parse("[doors]\nfront = 1\n").is_err());
    }

    #[test]
    fn test_non_numeric_position_rejected() {
        assert!(DesiredState::parse("[shutters]\nkitchen = \"half\"\n").is_err());
    }
}
