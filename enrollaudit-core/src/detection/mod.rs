//! Heuristic anomaly detection over normalized enrollment records.
//!
//! This module provides:
//! - **Rules**: eight fixed heuristics (pincode structure, state and
//!   district consistency, implausible ages, numeric outliers, temporal
//!   anomalies, duplicates, enrollment bursts)
//! - **Scoring**: a combined suspicion score per flagged record
//! - **Statistics**: state, pincode, age and daily distributions
//!
//! # Privacy
//! Findings carry the flagged record for review, but nothing in this
//! module logs a record value. Log lines hold counts, indices and rule
//! names only.
//!
//! # Example
//! ```rust,ignore
//! use enrollaudit_core::detection::{AnomalyEngine, DetectionConfig};
//!
//! let config = DetectionConfig::new().with_as_of(Some(today));
//! let report = AnomalyEngine::try_new(config)?.detect(&records);
//! ```

pub mod config;
mod dates;
mod engine;
pub mod geo;
mod profile;
mod rules;
mod scoring;
mod statistics;

pub use config::{
    AgeBucket, AnomalySensitivity, ConfigValidationError, DetectionConfig, UNKNOWN_AGE_BUCKET,
};
pub use dates::parse_date;
pub use engine::{AnomalyEngine, detect};
pub use profile::{ColumnStats, DatasetProfile, DistrictMajority, calculate_statistics};
pub use rules::{RULE_ORDER, RuleHit, RuleKind, pincode_defect};
pub use scoring::combine;
pub use statistics::compute_statistics;
