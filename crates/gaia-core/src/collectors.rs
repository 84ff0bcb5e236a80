//! The partner collector roster.
//!
//! Loaded once at startup (from YAML, or the embedded default) and shared
//! read-only for the lifetime of the process.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

const DEFAULT_ROSTER_YAML: &str = include_str!("../data/collectors.yaml");

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A single e-waste collection partner.
///
/// Field order is the serialization order of the prompt context block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collector {
    pub name: String,
    pub address: String,
    #[serde(serialize_with = "crate::geo::serialize_number")]
    pub latitude: f64,
    #[serde(serialize_with = "crate::geo::serialize_number")]
    pub longitude: f64,
    #[serde(default)]
    pub contact: Contact,
    pub hours: String,
    #[serde(default)]
    pub accepted_waste: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CollectorsFile {
    collectors: Vec<Collector>,
}

/// Validated, immutable roster of collectors in their configured order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Roster {
    collectors: Vec<Collector>,
}

impl Roster {
    /// Build a roster after validating every entry.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] for an empty name or coordinates
    /// that are non-finite or outside the valid latitude/longitude range.
    pub fn new(collectors: Vec<Collector>) -> Result<Self, ConfigError> {
        validate_collectors(&collectors)?;
        Ok(Self { collectors })
    }

    #[must_use]
    pub fn collectors(&self) -> &[Collector] {
        &self.collectors
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }
}

/// Parse and validate a roster from YAML text.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_collectors(yaml: &str) -> Result<Roster, ConfigError> {
    let file: CollectorsFile = serde_yaml::from_str(yaml)?;
    Roster::new(file.collectors)
}

/// Load and validate the roster from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_collectors(path: &Path) -> Result<Roster, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CollectorsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_collectors(&content)
}

/// The roster shipped with the binary.
///
/// # Errors
///
/// Returns `ConfigError` only if the embedded data is itself invalid.
pub fn default_roster() -> Result<Roster, ConfigError> {
    parse_collectors(DEFAULT_ROSTER_YAML)
}

fn validate_collectors(collectors: &[Collector]) -> Result<(), ConfigError> {
    for collector in collectors {
        if collector.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "collector name must be non-empty".to_string(),
            ));
        }

        if !collector.latitude.is_finite() || !(-90.0..=90.0).contains(&collector.latitude) {
            return Err(ConfigError::Validation(format!(
                "collector '{}' has invalid latitude {}; must be within [-90, 90]",
                collector.name, collector.latitude
            )));
        }

        if !collector.longitude.is_finite() || !(-180.0..=180.0).contains(&collector.longitude) {
            return Err(ConfigError::Validation(format!(
                "collector '{}' has invalid longitude {}; must be within [-180, 180]",
                collector.name, collector.longitude
            )));
        }
    }

    Ok(())
}
