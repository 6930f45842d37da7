//! Combined configuration file.
//!
//! A single JSON document configures both stages:
//!
//! ```json
//! {
//!   "normalizer": { "strictRows": false },
//!   "detection": { "ageMaxValid": 110, "sensitivity": "high" }
//! }
//! ```
//!
//! Every key is optional; absent keys keep their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::detection::DetectionConfig;
use crate::error::{AuditError, Result};
use crate::normalizer::NormalizerConfig;

/// Settings for one audit run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuditConfig {
    /// CSV normalization settings
    pub normalizer: NormalizerConfig,
    /// Heuristic thresholds and aggregation options
    pub detection: DetectionConfig,
}

impl AuditConfig {
    /// Creates a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set normalizer settings.
    pub fn with_normalizer(mut self, normalizer: NormalizerConfig) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Builder method to set detection settings.
    pub fn with_detection(mut self, detection: DetectionConfig) -> Self {
        self.detection = detection;
        self
    }

    /// Parses and validates a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| AuditError::serialization("Failed to parse configuration", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| AuditError::read_failed(path, e))?;
        let config = Self::from_json_str(&json)?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Validates the detection thresholds.
    pub fn validate(&self) -> Result<()> {
        self.detection
            .validate()
            .map_err(|e| AuditError::configuration(e.to_string()))
    }
}
