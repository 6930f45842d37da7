//! Anomaly engine facade.
//!
//! [`AnomalyEngine`] builds the per-run profile, runs every heuristic over
//! every record and computes the dataset aggregates. It never touches the
//! clock, the filesystem or the network; the same records and config always
//! give the same report.

use crate::error::{AuditError, Result};
use crate::models::{AnomalyFinding, DetectionReport, Record};

use super::config::DetectionConfig;
use super::profile::DatasetProfile;
use super::rules::RULE_ORDER;
use super::scoring::combine;
use super::statistics::compute_statistics;

/// Heuristic anomaly engine for enrollment records.
///
/// # Example
///
/// ```rust,ignore
/// use enrollaudit_core::detection::{AnomalyEngine, DetectionConfig};
///
/// let engine = AnomalyEngine::try_new(DetectionConfig::default())?;
/// let report = engine.detect(&records);
/// println!("{} of {} rows flagged", report.stats.anomaly_count, report.stats.total_rows);
/// ```
#[derive(Debug, Clone)]
pub struct AnomalyEngine {
    config: DetectionConfig,
}

impl AnomalyEngine {
    /// Creates an engine without validating `config`.
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    /// Creates an engine after validating `config`.
    pub fn try_new(config: DetectionConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| AuditError::configuration(e.to_string()))?;
        Ok(Self::new(config))
    }

    /// Creates an engine with default thresholds.
    pub fn with_defaults() -> Self {
        Self::new(DetectionConfig::default())
    }

    /// Returns a reference to the engine configuration.
    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Scores every record and aggregates the dataset.
    ///
    /// Findings are produced only for records where at least one heuristic
    /// fired, in ascending index order. Reasons and detailed reasons follow
    /// the fixed rule order.
    pub fn detect(&self, records: &[Record]) -> DetectionReport {
        let profile = DatasetProfile::build(records, &self.config);
        tracing::debug!(
            "Profiled {} records: {} numeric columns, {} pincode majorities",
            records.len(),
            profile.numeric_columns.len(),
            profile.pincode_districts.len()
        );

        let findings: Vec<AnomalyFinding> = records
            .iter()
            .enumerate()
            .filter_map(|(index, record)| self.score_record(record, index, &profile))
            .collect();

        let stats = compute_statistics(records, findings.len(), &self.config);
        tracing::debug!(
            "Detection flagged {} of {} records",
            stats.anomaly_count,
            stats.total_rows
        );

        DetectionReport { findings, stats }
    }

    fn score_record(
        &self,
        record: &Record,
        index: usize,
        profile: &DatasetProfile,
    ) -> Option<AnomalyFinding> {
        let hits: Vec<_> = RULE_ORDER
            .iter()
            .filter_map(|rule| rule.evaluate(record, index, profile, &self.config))
            .collect();
        if hits.is_empty() {
            return None;
        }

        for hit in &hits {
            tracing::trace!("Record {} matched {}", index, hit.rule.name());
        }

        let score = combine(hits.iter().map(|hit| hit.rule.importance()));
        let mut reasons = Vec::with_capacity(hits.len());
        let mut detailed_reasons = Vec::with_capacity(hits.len());
        for hit in hits {
            reasons.push(hit.reason);
            detailed_reasons.extend(hit.details);
        }

        Some(AnomalyFinding {
            row: record.clone(),
            index,
            reasons,
            detailed_reasons,
            score,
        })
    }
}

impl Default for AnomalyEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Runs the default engine over `records`.
pub fn detect(records: &[Record]) -> DetectionReport {
    AnomalyEngine::with_defaults().detect(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::config::AnomalySensitivity;

    fn clean(pincode: i64) -> Record {
        Record::new()
            .with("date", "2025-03-01")
            .with("state", "Kerala")
            .with("district", "Ernakulam")
            .with("pincode", pincode)
            .with("age", 34)
    }

    #[test]
    fn test_engine_defaults() {
        let engine = AnomalyEngine::with_defaults();
        assert_eq!(engine.config().sensitivity, AnomalySensitivity::Medium);
        assert_eq!(engine.config().top_states_limit, 10);
    }

    #[test]
    fn test_try_new_rejects_invalid_config() {
        let config = DetectionConfig {
            age_min_valid: 90.0,
            age_max_valid: 10.0,
            ..DetectionConfig::default()
        };
        let err = AnomalyEngine::try_new(config).unwrap_err();
        assert!(matches!(err, AuditError::Configuration { .. }));
        assert!(err.to_string().contains("ageMinValid"));
    }

    #[test]
    fn test_clean_records_produce_no_findings() {
        let records = vec![clean(682001), clean(682002).with("age", 41)];
        let report = AnomalyEngine::with_defaults().detect(&records);
        assert!(report.findings.is_empty());
        assert_eq!(report.stats.total_rows, 2);
        assert_eq!(report.stats.anomaly_rate, 0.0);
    }

    #[test]
    fn test_multiple_rules_keep_order_and_combine() {
        let records = vec![clean(682001).with("pincode", "ABCDE").with("age", 150)];
        let report = detect(&records);

        assert_eq!(report.findings.len(), 1);
        let finding = &report.findings[0];
        assert_eq!(finding.index, 0);
        assert_eq!(finding.reasons, vec!["Malformed pincode", "Implausible age"]);
        assert_eq!(finding.detailed_reasons.len(), 2);
        assert_eq!(finding.detailed_reasons[0].feature, "pincode");
        assert_eq!(finding.detailed_reasons[1].feature, "age");
        assert_eq!(finding.score, 0.96);
    }

    #[test]
    fn test_findings_in_ascending_index_order() {
        let records = vec![
            clean(682001).with("age", 200),
            clean(682001).with("age", 30),
            clean(682001).with("pincode", "12"),
        ];
        let report = detect(&records);
        let indices: Vec<usize> = report.findings.iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![0, 2]);
        assert_eq!(report.stats.anomaly_count, 2);
    }

    #[test]
    fn test_empty_input_is_not_an_error() {
        let report = detect(&[]);
        assert!(report.findings.is_empty());
        assert_eq!(report.stats.total_rows, 0);
        assert_eq!(report.stats.anomaly_rate, 0.0);
    }

    #[test]
    fn test_detect_is_idempotent() {
        let records = vec![
            clean(682001),
            clean(110001),
            clean(682001).with("age", -4),
            clean(682001),
        ];
        let engine = AnomalyEngine::with_defaults();
        assert_eq!(engine.detect(&records), engine.detect(&records));
    }
}
