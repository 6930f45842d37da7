//! Per-record heuristics.
//!
//! Rules run in the fixed order of [`RULE_ORDER`]; that order only decides
//! how reasons are listed, never the score. A rule that lacks the fields it
//! needs does not fire.

use crate::models::{DetailedReason, FieldValue, Record};

use super::config::DetectionConfig;
use super::dates::{day_ordinal, parse_date};
use super::geo::{RegionCheck, check_state_pincode, normalize_region_name};
use super::profile::DatasetProfile;

/// Identifies one heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// Pincode fails the structural check
    MalformedPincode,
    /// Pincode prefix belongs to another state's postal circle
    StatePincodeMismatch,
    /// Pincode usually recorded under a different district
    PincodeDistrictConflict,
    /// Age outside the plausible range
    ImplausibleAge,
    /// Numeric column value far from its column mean
    NumericOutlier,
    /// Date unparseable, in the future, too early, or far outside the range
    TemporalAnomaly,
    /// Identical to an earlier record
    DuplicateRecord,
    /// Abnormal same-day volume for one pincode and operator
    EnrollmentBurst,
}

/// Evaluation order of the heuristics.
pub const RULE_ORDER: [RuleKind; 8] = [
    RuleKind::MalformedPincode,
    RuleKind::StatePincodeMismatch,
    RuleKind::PincodeDistrictConflict,
    RuleKind::ImplausibleAge,
    RuleKind::NumericOutlier,
    RuleKind::TemporalAnomaly,
    RuleKind::DuplicateRecord,
    RuleKind::EnrollmentBurst,
];

impl RuleKind {
    /// Contribution strength of this rule (0.0-1.0).
    pub fn importance(&self) -> f64 {
        match self {
            RuleKind::MalformedPincode => 0.90,
            RuleKind::StatePincodeMismatch => 0.80,
            RuleKind::PincodeDistrictConflict => 0.60,
            RuleKind::ImplausibleAge => 0.60,
            RuleKind::NumericOutlier => 0.50,
            RuleKind::TemporalAnomaly => 0.50,
            RuleKind::DuplicateRecord => 0.35,
            RuleKind::EnrollmentBurst => 0.30,
        }
    }

    /// Stable identifier used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            RuleKind::MalformedPincode => "malformed_pincode",
            RuleKind::StatePincodeMismatch => "state_pincode_mismatch",
            RuleKind::PincodeDistrictConflict => "pincode_district_conflict",
            RuleKind::ImplausibleAge => "implausible_age",
            RuleKind::NumericOutlier => "numeric_outlier",
            RuleKind::TemporalAnomaly => "temporal_anomaly",
            RuleKind::DuplicateRecord => "duplicate_record",
            RuleKind::EnrollmentBurst => "enrollment_burst",
        }
    }

    /// Evaluates this rule against one record.
    pub fn evaluate(
        &self,
        record: &Record,
        index: usize,
        profile: &DatasetProfile,
        config: &DetectionConfig,
    ) -> Option<RuleHit> {
        match self {
            RuleKind::MalformedPincode => malformed_pincode(record, config),
            RuleKind::StatePincodeMismatch => state_pincode_mismatch(record, config),
            RuleKind::PincodeDistrictConflict => pincode_district_conflict(record, profile),
            RuleKind::ImplausibleAge => implausible_age(record, config),
            RuleKind::NumericOutlier => numeric_outlier(record, profile, config),
            RuleKind::TemporalAnomaly => temporal_anomaly(record, profile, config),
            RuleKind::DuplicateRecord => duplicate_record(index, profile),
            RuleKind::EnrollmentBurst => enrollment_burst(index, profile, config),
        }
    }
}

/// A fired rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleHit {
    /// Which rule fired
    pub rule: RuleKind,
    /// Short reason shown in lists
    pub reason: String,
    /// One or more detailed entries
    pub details: Vec<DetailedReason>,
}

impl RuleHit {
    fn new(rule: RuleKind, reason: impl Into<String>) -> Self {
        Self {
            rule,
            reason: reason.into(),
            details: Vec::new(),
        }
    }

    fn detail(
        mut self,
        feature: impl Into<String>,
        value: FieldValue,
        explanation: impl Into<String>,
    ) -> Self {
        self.details.push(DetailedReason {
            feature: feature.into(),
            value,
            explanation: explanation.into(),
            importance: self.rule.importance(),
        });
        self
    }
}

/// Structural problem with a pincode, if any.
pub fn pincode_defect(pincode: &str, digit_count: usize) -> Option<String> {
    if !pincode.chars().all(|c| c.is_ascii_digit()) {
        return Some(format!(
            "Pincode must be {} digits but contains non-digit characters",
            digit_count
        ));
    }
    if pincode.len() != digit_count {
        return Some(format!(
            "Pincode must be exactly {} digits; found {}",
            digit_count,
            pincode.len()
        ));
    }
    if pincode.starts_with('0') {
        return Some("Pincode cannot start with 0".to_string());
    }
    None
}

fn malformed_pincode(record: &Record, config: &DetectionConfig) -> Option<RuleHit> {
    let pincode = record.pincode()?;
    let explanation = pincode_defect(&pincode, config.pincode_digit_count)?;
    Some(
        RuleHit::new(RuleKind::MalformedPincode, "Malformed pincode").detail(
            "pincode",
            FieldValue::Text(pincode.into_owned()),
            explanation,
        ),
    )
}

fn state_pincode_mismatch(record: &Record, config: &DetectionConfig) -> Option<RuleHit> {
    let pincode = record.pincode()?;
    if pincode_defect(&pincode, config.pincode_digit_count).is_some() {
        return None;
    }
    let state = record.state()?;
    match check_state_pincode(&state, &pincode) {
        RegionCheck::Mismatch { prefix } => Some(
            RuleHit::new(
                RuleKind::StatePincodeMismatch,
                "Pincode does not belong to the state",
            )
            .detail(
                "pincode",
                FieldValue::Text(pincode.into_owned()),
                format!(
                    "Pincode prefix {:02} is not used by postal circles in {}",
                    prefix, state
                ),
            ),
        ),
        RegionCheck::Consistent | RegionCheck::Unknown => None,
    }
}

fn pincode_district_conflict(record: &Record, profile: &DatasetProfile) -> Option<RuleHit> {
    let pincode = record.pincode()?;
    let district = record.district()?;
    let majority = profile.pincode_districts.get(&*pincode)?;
    if normalize_region_name(&district) == majority.normalized {
        return None;
    }
    Some(
        RuleHit::new(
            RuleKind::PincodeDistrictConflict,
            "District does not match pincode",
        )
        .detail(
            "district",
            FieldValue::Text(district.into_owned()),
            format!(
                "Pincode {} is recorded under {} in {} of {} rows",
                pincode, majority.district, majority.rows, majority.total
            ),
        ),
    )
}

fn implausible_age(record: &Record, config: &DetectionConfig) -> Option<RuleHit> {
    let (field, value) = record.get_ignore_case(&config.age_field)?;
    let age = value.as_f64()?;
    if (config.age_min_valid..=config.age_max_valid).contains(&age) {
        return None;
    }
    Some(
        RuleHit::new(RuleKind::ImplausibleAge, "Implausible age").detail(
            field,
            value.clone(),
            format!(
                "Age {} is outside the plausible range {}-{}",
                value, config.age_min_valid, config.age_max_valid
            ),
        ),
    )
}

fn numeric_outlier(
    record: &Record,
    profile: &DatasetProfile,
    config: &DetectionConfig,
) -> Option<RuleHit> {
    let z_threshold = config.sensitivity.z_score_threshold();
    let outliers: Vec<(&str, &FieldValue, f64)> = record
        .fields()
        .filter_map(|(name, value)| {
            let stats = profile.numeric_columns.get(name)?;
            let z_score = stats.z_score(value.as_f64()?);
            (z_score > z_threshold).then_some((name, value, z_score))
        })
        .collect();

    if outliers.is_empty() {
        return None;
    }

    let columns: Vec<&str> = outliers.iter().map(|(name, _, _)| *name).collect();
    let mut hit = RuleHit::new(
        RuleKind::NumericOutlier,
        format!("Statistical outlier in {}", columns.join(", ")),
    );
    for (name, value, z_score) in outliers {
        let mean = profile.numeric_columns.get(name).map_or(0.0, |s| s.mean);
        hit = hit.detail(
            name,
            value.clone(),
            format!(
                "{:.1} standard deviations from the column mean of {:.2}",
                z_score, mean
            ),
        );
    }
    Some(hit)
}

fn temporal_anomaly(
    record: &Record,
    profile: &DatasetProfile,
    config: &DetectionConfig,
) -> Option<RuleHit> {
    let raw = record.date()?;
    let value = FieldValue::Text(raw.to_string());

    let Some(date) = parse_date(&raw) else {
        return Some(
            RuleHit::new(RuleKind::TemporalAnomaly, "Unreadable date").detail(
                "date",
                value,
                "Date is not in a recognized format",
            ),
        );
    };

    if let Some(as_of) = config.as_of
        && date > as_of
    {
        return Some(
            RuleHit::new(RuleKind::TemporalAnomaly, "Date in the future").detail(
                "date",
                value,
                format!("Date {} is after {}", date, as_of),
            ),
        );
    }

    if date < config.earliest_plausible_date {
        return Some(
            RuleHit::new(RuleKind::TemporalAnomaly, "Implausibly early date").detail(
                "date",
                value,
                format!(
                    "Date {} is before enrollment began on {}",
                    date, config.earliest_plausible_date
                ),
            ),
        );
    }

    let stats = profile.dates?;
    let z_score = stats.z_score(day_ordinal(date));
    (z_score > config.date_z_score_threshold).then(|| {
        RuleHit::new(
            RuleKind::TemporalAnomaly,
            "Date far outside the dataset's range",
        )
        .detail(
            "date",
            value,
            format!(
                "Date {} is {:.1} standard deviations from the mean enrollment date",
                date, z_score
            ),
        )
    })
}

fn duplicate_record(index: usize, profile: &DatasetProfile) -> Option<RuleHit> {
    let first = (*profile.duplicate_of.get(index)?)?;
    Some(
        RuleHit::new(RuleKind::DuplicateRecord, "Duplicate record").detail(
            "record",
            FieldValue::Integer(i64::try_from(first).unwrap_or(i64::MAX)),
            format!("Identical to the record at index {}", first),
        ),
    )
}

fn enrollment_burst(
    index: usize,
    profile: &DatasetProfile,
    config: &DetectionConfig,
) -> Option<RuleHit> {
    let size = (*profile.burst_group_sizes.get(index)?)?;
    if size < config.burst_min_count {
        return None;
    }
    if (size as f64) < config.burst_factor * profile.mean_burst_group {
        return None;
    }
    Some(
        RuleHit::new(RuleKind::EnrollmentBurst, "Unusual enrollment volume").detail(
            "date",
            FieldValue::Integer(i64::try_from(size).unwrap_or(i64::MAX)),
            format!(
                "{} enrollments share this day, pincode and operator; the average group has {:.1}",
                size, profile.mean_burst_group
            ),
        ),
    )
}
