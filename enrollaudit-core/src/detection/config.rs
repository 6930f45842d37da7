//! Detection configuration.
//!
//! Every threshold the heuristics and aggregations use lives here with a
//! documented default. Options serialize in camelCase so a JSON config
//! file reads `{"pincodeDigitCount": 6, "ageMaxValid": 120, ...}`; absent
//! keys keep their defaults.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Numeric outlier sensitivity.
///
/// Controls how many standard deviations from the column mean a value
/// must be to be considered an outlier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnomalySensitivity {
    /// 3.0 standard deviations - fewer false positives
    Low,
    /// 2.5 standard deviations - balanced detection
    #[default]
    Medium,
    /// 2.0 standard deviations - more aggressive detection
    High,
}

impl AnomalySensitivity {
    /// Returns the z-score threshold for this sensitivity level.
    pub fn z_score_threshold(&self) -> f64 {
        match self {
            AnomalySensitivity::Low => 3.0,
            AnomalySensitivity::Medium => 2.5,
            AnomalySensitivity::High => 2.0,
        }
    }
}

/// One age histogram bucket, half-open `[min, max)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeBucket {
    /// Label reported in the histogram
    pub label: String,
    /// Inclusive lower bound
    pub min: f64,
    /// Exclusive upper bound; `None` means unbounded
    pub max: Option<f64>,
}

impl AgeBucket {
    /// Creates a bucket.
    pub fn new(label: impl Into<String>, min: f64, max: Option<f64>) -> Self {
        Self {
            label: label.into(),
            min,
            max,
        }
    }

    /// True when `age` falls inside this bucket.
    pub fn contains(&self, age: f64) -> bool {
        age >= self.min && self.max.is_none_or(|max| age < max)
    }
}

/// Label of the bucket collecting missing, non-numeric and negative ages.
pub const UNKNOWN_AGE_BUCKET: &str = "Unknown";

// Labels name the half-open `[min, max)` range, so `0-18` holds 17.5 but not 18.
fn default_age_buckets() -> Vec<AgeBucket> {
    vec![
        AgeBucket::new("0-18", 0.0, Some(18.0)),
        AgeBucket::new("18-30", 18.0, Some(30.0)),
        AgeBucket::new("30-45", 30.0, Some(45.0)),
        AgeBucket::new("45-60", 45.0, Some(60.0)),
        AgeBucket::new("60+", 60.0, None),
    ]
}

/// Validation errors for detection configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigValidationError {
    #[error("pincodeDigitCount must be positive")]
    InvalidPincodeDigitCount,
    #[error("ageMinValid ({min}) must not exceed ageMaxValid ({max})")]
    InvalidAgeRange { min: f64, max: f64 },
    #[error("topStatesLimit must be positive")]
    InvalidTopStatesLimit,
    #[error("age bucket '{label}' is empty or inverted")]
    InvalidAgeBucket { label: String },
    #[error("age buckets must be sorted and non-overlapping at '{label}'")]
    OverlappingAgeBuckets { label: String },
    #[error("dateZScoreThreshold must be positive, got {0}")]
    InvalidDateZScore(f64),
    #[error("burstFactor must be at least 1.0, got {0}")]
    InvalidBurstFactor(f64),
}

/// Detection thresholds and aggregation options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetectionConfig {
    /// Digits in a well-formed pincode
    pub pincode_digit_count: usize,
    /// Column holding the enrollee's age (matched case-insensitively)
    pub age_field: String,
    /// Lowest plausible age, inclusive
    pub age_min_valid: f64,
    /// Highest plausible age, inclusive
    pub age_max_valid: f64,
    /// Number of entries kept in `topStates`
    pub top_states_limit: usize,
    /// Optional cap on `pincodeHeatmap` entries
    pub pincode_heatmap_limit: Option<usize>,
    /// Age histogram buckets, ascending
    pub age_buckets: Vec<AgeBucket>,
    /// Numeric outlier sensitivity
    pub sensitivity: AnomalySensitivity,
    /// Standard deviations from the mean date that count as an outlier
    pub date_z_score_threshold: f64,
    /// Dates before this day are implausible
    pub earliest_plausible_date: NaiveDate,
    /// Dates after this day are in the future; `None` disables the check
    pub as_of: Option<NaiveDate>,
    /// Rows a pincode needs before its majority district is trusted
    pub pincode_district_min_rows: u64,
    /// Smallest same-day group that can be a burst
    pub burst_min_count: u64,
    /// Multiple of the mean group size a burst must reach
    pub burst_factor: f64,
    /// Columns identifying the enrolling operator, used to group bursts
    pub operator_fields: Vec<String>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            pincode_digit_count: 6,
            age_field: "age".to_string(),
            age_min_valid: 0.0,
            age_max_valid: 120.0,
            top_states_limit: 10,
            pincode_heatmap_limit: None,
            age_buckets: default_age_buckets(),
            sensitivity: AnomalySensitivity::Medium,
            date_z_score_threshold: 3.0,
            // Aadhaar enrollment opened in 2010
            earliest_plausible_date: NaiveDate::from_ymd_opt(2010, 1, 1).unwrap_or_default(),
            as_of: None,
            pincode_district_min_rows: 3,
            burst_min_count: 10,
            burst_factor: 3.0,
            operator_fields: vec!["operator_id".to_string(), "operator".to_string()],
        }
    }
}

impl DetectionConfig {
    /// Creates a detection config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the pincode digit count.
    pub fn with_pincode_digit_count(mut self, digits: usize) -> Self {
        if digits == 0 {
            tracing::warn!("pincodeDigitCount 0 raised to 1");
        }
        self.pincode_digit_count = digits.max(1);
        self
    }

    /// Builder method to set the age column name.
    pub fn with_age_field(mut self, field: impl Into<String>) -> Self {
        self.age_field = field.into();
        self
    }

    /// Builder method to set the plausible age range.
    pub fn with_age_range(mut self, min: f64, max: f64) -> Self {
        if min > max {
            tracing::warn!("age range [{}, {}] inverted, swapping bounds", min, max);
        }
        self.age_min_valid = min.min(max);
        self.age_max_valid = max.max(min);
        self
    }

    /// Builder method to set the number of states reported.
    pub fn with_top_states_limit(mut self, limit: usize) -> Self {
        if limit == 0 {
            tracing::warn!("topStatesLimit 0 raised to 1");
        }
        self.top_states_limit = limit.max(1);
        self
    }

    /// Builder method to cap the pincode heatmap.
    pub fn with_pincode_heatmap_limit(mut self, limit: Option<usize>) -> Self {
        self.pincode_heatmap_limit = limit;
        self
    }

    /// Builder method to replace the age buckets.
    pub fn with_age_buckets(mut self, buckets: Vec<AgeBucket>) -> Self {
        self.age_buckets = buckets;
        self
    }

    /// Builder method to set numeric outlier sensitivity.
    pub fn with_sensitivity(mut self, sensitivity: AnomalySensitivity) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    /// Builder method to set the date z-score threshold.
    pub fn with_date_z_score_threshold(mut self, threshold: f64) -> Self {
        self.date_z_score_threshold = threshold;
        self
    }

    /// Builder method to set the earliest plausible date.
    pub fn with_earliest_plausible_date(mut self, date: NaiveDate) -> Self {
        self.earliest_plausible_date = date;
        self
    }

    /// Builder method to set the reference day for future-date checks.
    pub fn with_as_of(mut self, as_of: Option<NaiveDate>) -> Self {
        self.as_of = as_of;
        self
    }

    /// Builder method to set the pincode/district majority minimum.
    pub fn with_pincode_district_min_rows(mut self, rows: u64) -> Self {
        self.pincode_district_min_rows = rows;
        self
    }

    /// Builder method to set burst thresholds.
    pub fn with_burst(mut self, min_count: u64, factor: f64) -> Self {
        if factor < 1.0 {
            tracing::warn!("burstFactor {} clamped to 1.0", factor);
        }
        self.burst_min_count = min_count;
        self.burst_factor = factor.max(1.0);
        self
    }

    /// Builder method to set the operator columns.
    pub fn with_operator_fields(mut self, fields: Vec<String>) -> Self {
        self.operator_fields = fields;
        self
    }

    /// Validates the configuration.
    ///
    /// Returns an error if any threshold is outside its valid range.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.pincode_digit_count == 0 {
            return Err(ConfigValidationError::InvalidPincodeDigitCount);
        }
        if self.age_min_valid > self.age_max_valid {
            return Err(ConfigValidationError::InvalidAgeRange {
                min: self.age_min_valid,
                max: self.age_max_valid,
            });
        }
        if self.top_states_limit == 0 {
            return Err(ConfigValidationError::InvalidTopStatesLimit);
        }
        let mut previous_max: Option<f64> = None;
        for (position, bucket) in self.age_buckets.iter().enumerate() {
            if bucket.max.is_some_and(|max| max <= bucket.min) {
                return Err(ConfigValidationError::InvalidAgeBucket {
                    label: bucket.label.clone(),
                });
            }
            if position > 0 && previous_max.is_none_or(|max| bucket.min < max) {
                return Err(ConfigValidationError::OverlappingAgeBuckets {
                    label: bucket.label.clone(),
                });
            }
            previous_max = bucket.max;
        }
        if self.date_z_score_threshold <= 0.0 || !self.date_z_score_threshold.is_finite() {
            return Err(ConfigValidationError::InvalidDateZScore(
                self.date_z_score_threshold,
            ));
        }
        if self.burst_factor < 1.0 || !self.burst_factor.is_finite() {
            return Err(ConfigValidationError::InvalidBurstFactor(self.burst_factor));
        }
        Ok(())
    }
}
