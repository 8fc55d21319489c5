//! Canonical experiment record.
//!
//! Every data source (Amplitude, a local JSON file, an HTTP request body) is
//! normalized into [`ExperimentRecord`] before it reaches the analyst.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::utils::opt_string_or_number;

/// Conventional key of the control arm in [`ExperimentRecord::variants`].
pub const CONTROL_KEY: &str = "control";

#[derive(Debug, Error)]
pub enum ExperimentError {
    #[error("failed to read experiment file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid experiment data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid experiment data: missing variants")]
    NoVariants,
}

/// One A/B test, ready to be analysed.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExperimentRecord {
    #[serde(default = "default_experiment_name")]
    pub experiment_name: String,
    #[serde(default)]
    pub hypothesis: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    /// Variant key (`control`, `variant_<id>`, ...) → observed metrics.
    #[serde(default)]
    pub variants: BTreeMap<String, VariantStats>,
    #[serde(default)]
    pub metadata: ExperimentMetadata,
}

fn default_experiment_name() -> String {
    "Unknown Experiment".to_string()
}

/// Observed metrics for one arm.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct VariantStats {
    #[serde(default = "default_variant_name")]
    pub name: String,
    #[serde(default)]
    pub users: u64,
    #[serde(default)]
    pub conversions: u64,
    #[serde(default)]
    pub conversion_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_session_duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounce_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue_per_user: Option<f64>,
}

fn default_variant_name() -> String {
    "Unknown".to_string()
}

impl VariantStats {
    /// Stats with only the primary metric filled in.
    pub fn new(name: impl Into<String>, users: u64, conversions: u64) -> Self {
        let conversion_rate = if users == 0 {
            0.0
        } else {
            conversions as f64 / users as f64
        };
        Self {
            name: name.into(),
            users,
            conversions,
            conversion_rate,
            avg_session_duration: None,
            bounce_rate: None,
            revenue_per_user: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExperimentMetadata {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub experiment_id: Option<String>,
    #[serde(default = "default_traffic_source")]
    pub traffic_source: String,
    #[serde(default = "default_segment")]
    pub segment: String,
    #[serde(default = "default_platform")]
    pub platform: String,
}

fn default_traffic_source() -> String {
    "mixed".to_string()
}

fn default_segment() -> String {
    "all_users".to_string()
}

fn default_platform() -> String {
    "all".to_string()
}

impl Default for ExperimentMetadata {
    fn default() -> Self {
        Self {
            experiment_id: None,
            traffic_source: default_traffic_source(),
            segment: default_segment(),
            platform: default_platform(),
        }
    }
}

impl ExperimentRecord {
    /// Create a record with default metadata and no variants.
    pub fn new(experiment_name: impl Into<String>) -> Self {
        Self {
            experiment_name: experiment_name.into(),
            hypothesis: String::new(),
            start_date: String::new(),
            end_date: String::new(),
            variants: BTreeMap::new(),
            metadata: ExperimentMetadata::default(),
        }
    }

    /// Builder-style helper to add an arm.
    pub fn with_variant(mut self, key: impl Into<String>, stats: VariantStats) -> Self {
        self.variants.insert(key.into(), stats);
        self
    }

    /// Parse a canonical record from JSON and validate it.
    pub fn from_json(json: &str) -> Result<Self, ExperimentError> {
        let record: ExperimentRecord = serde_json::from_str(json)?;
        record.validate()?;
        Ok(record)
    }

    /// Parse an already-decoded JSON value and validate it.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ExperimentError> {
        let record: ExperimentRecord = serde_json::from_value(value)?;
        record.validate()?;
        Ok(record)
    }

    /// Load a canonical record from a local JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ExperimentError> {
        debug!("Loading experiment from {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|source| ExperimentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// A record must have at least one arm to be worth analysing.
    pub fn validate(&self) -> Result<(), ExperimentError> {
        if self.variants.is_empty() {
            return Err(ExperimentError::NoVariants);
        }
        Ok(())
    }

    /// Variant keys in map order.
    pub fn variant_keys(&self) -> Vec<&str> {
        self.variants.keys().map(String::as_str).collect()
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
