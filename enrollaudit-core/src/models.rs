//! Record, finding and statistics models.
//!
//! These are the shapes handed to presentation layers and to the
//! summarization collaborator. Output types serialize in camelCase so the
//! JSON matches what those consumers read (`detailedReasons`, `totalRows`,
//! ...).

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Enrollment date field.
pub const DATE_FIELD: &str = "date";
/// State field.
pub const STATE_FIELD: &str = "state";
/// District field.
pub const DISTRICT_FIELD: &str = "district";
/// Postal index number field.
pub const PINCODE_FIELD: &str = "pincode";

/// Fields every enrollment export is expected to carry.
pub const MANDATORY_FIELDS: [&str; 4] = [DATE_FIELD, STATE_FIELD, DISTRICT_FIELD, PINCODE_FIELD];

/// A single cell after type coercion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Cell parsed as a signed integer
    Integer(i64),
    /// Cell parsed as a finite float
    Float(f64),
    /// Anything else, trimmed
    Text(String),
}

impl FieldValue {
    /// Coerces a raw CSV cell: integer first, then finite float, else text.
    ///
    /// `NaN` and `inf` spellings stay text so they never reach the
    /// statistics. An integer is only produced when its rendering equals
    /// the cell, so `007` and `+7` keep their original text.
    pub fn from_cell(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(i) = trimmed.parse::<i64>() {
            if i.to_string() == trimmed {
                return FieldValue::Integer(i);
            }
            return FieldValue::Text(trimmed.to_string());
        }
        match trimmed.parse::<f64>() {
            Ok(f) if f.is_finite() => FieldValue::Float(f),
            _ => FieldValue::Text(trimmed.to_string()),
        }
    }

    /// Returns the numeric value, if this cell is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Float(f) => Some(*f),
            FieldValue::Text(_) => None,
        }
    }

    /// Returns the textual rendering of the cell.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            FieldValue::Text(s) => Cow::Borrowed(s.as_str()),
            other => Cow::Owned(other.to_string()),
        }
    }

    /// True for empty text cells.
    pub fn is_blank(&self) -> bool {
        matches!(self, FieldValue::Text(s) if s.trim().is_empty())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Integer(i64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

/// One normalized enrollment row.
///
/// The field set depends on the uploaded file. Lookups of the mandatory
/// fields fall back to a case-insensitive match so `State` and `state`
/// resolve to the same column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field, replacing any previous value under the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    /// Builder form of [`Record::insert`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value.into());
        self
    }

    /// Exact-name lookup.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Exact lookup, then the first case-insensitive match.
    pub fn get_ignore_case(&self, name: &str) -> Option<(&str, &FieldValue)> {
        if let Some((key, value)) = self.fields.get_key_value(name) {
            return Some((key.as_str(), value));
        }
        self.fields
            .iter()
            .find(|(key, _)| key.trim().eq_ignore_ascii_case(name))
            .map(|(key, value)| (key.as_str(), value))
    }

    /// Non-blank text of a field, looked up case-insensitively.
    pub fn text(&self, name: &str) -> Option<Cow<'_, str>> {
        self.get_ignore_case(name)
            .map(|(_, value)| value)
            .filter(|value| !value.is_blank())
            .map(FieldValue::as_text)
    }

    /// Numeric value of a field, looked up case-insensitively.
    pub fn number(&self, name: &str) -> Option<f64> {
        self.get_ignore_case(name).and_then(|(_, value)| value.as_f64())
    }

    /// The `date` field as text.
    pub fn date(&self) -> Option<Cow<'_, str>> {
        self.text(DATE_FIELD)
    }

    /// The `state` field as text.
    pub fn state(&self) -> Option<Cow<'_, str>> {
        self.text(STATE_FIELD)
    }

    /// The `district` field as text.
    pub fn district(&self) -> Option<Cow<'_, str>> {
        self.text(DISTRICT_FIELD)
    }

    /// The `pincode` field as text.
    pub fn pincode(&self) -> Option<Cow<'_, str>> {
        self.text(PINCODE_FIELD)
    }

    /// Iterates fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields present.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when no field is present.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Stable textual key of the whole record, used for duplicate checks.
    pub(crate) fn canonical_key(&self) -> String {
        let mut key = String::new();
        for (name, value) in &self.fields {
            key.push_str(name);
            key.push('\u{1f}');
            key.push_str(&value.as_text());
            key.push('\u{1e}');
        }
        key
    }
}

/// Detailed explanation of one fired heuristic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedReason {
    /// Field the heuristic looked at
    pub feature: String,
    /// Offending value
    pub value: FieldValue,
    /// Human-readable explanation
    pub explanation: String,
    /// Contribution strength (0.0-1.0)
    pub importance: f64,
}

/// A record flagged by at least one heuristic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyFinding {
    /// The flagged record
    pub row: Record,
    /// Zero-based position in the uploaded sequence
    pub index: usize,
    /// Short reasons, in rule evaluation order
    pub reasons: Vec<String>,
    /// Detailed reasons, in rule evaluation order
    pub detailed_reasons: Vec<DetailedReason>,
    /// Combined suspicion score (0.0-1.0)
    pub score: f64,
}

/// State frequency entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateCount {
    /// State name as written in the upload
    pub name: String,
    /// Number of records
    pub value: u64,
}

/// Pincode frequency entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PincodeCount {
    /// Pincode text
    pub pincode: String,
    /// Number of records
    pub count: u64,
}

/// Age histogram bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeBucketCount {
    /// Bucket label, e.g. `18-30` for `[18, 30)`
    pub range: String,
    /// Number of records
    pub count: u64,
}

/// Records per enrollment day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    /// Day, serialized as `YYYY-MM-DD`
    pub date: NaiveDate,
    /// Number of records
    pub count: u64,
}

/// Dataset-wide aggregates for one upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetStatistics {
    /// Number of records analyzed
    pub total_rows: u64,
    /// Number of findings
    pub anomaly_count: u64,
    /// `anomaly_count / total_rows`, 0.0 for an empty dataset
    pub anomaly_rate: f64,
    /// Most frequent states, descending
    pub top_states: Vec<StateCount>,
    /// Frequency per pincode, descending
    pub pincode_heatmap: Vec<PincodeCount>,
    /// Age histogram including the unknown bucket
    pub age_distribution: Vec<AgeBucketCount>,
    /// Records per day, ascending
    pub time_series: Vec<DailyCount>,
}

impl Default for DatasetStatistics {
    fn default() -> Self {
        Self {
            total_rows: 0,
            anomaly_count: 0,
            anomaly_rate: 0.0,
            top_states: Vec::new(),
            pincode_heatmap: Vec::new(),
            age_distribution: Vec::new(),
            time_series: Vec::new(),
        }
    }
}

/// Output of one detection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionReport {
    /// Flagged records in input order
    pub findings: Vec<AnomalyFinding>,
    /// Dataset aggregates
    pub stats: DatasetStatistics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_value_coercion() {
        assert_eq!(FieldValue::from_cell("42"), FieldValue::Integer(42));
        assert_eq!(FieldValue::from_cell(" -7 "), FieldValue::Integer(-7));
        assert_eq!(FieldValue::from_cell("3.5"), FieldValue::Float(3.5));
        assert_eq!(
            FieldValue::from_cell("  Bihar "),
            FieldValue::Text("Bihar".to_string())
        );
        assert_eq!(FieldValue::from_cell(""), FieldValue::Text(String::new()));
    }

    #[test]
    fn test_field_value_non_canonical_integer_stays_text() {
        for raw in ["007", "+7", "0682001", "+682001", "-0"] {
            assert_eq!(
                FieldValue::from_cell(raw),
                FieldValue::Text(raw.to_string()),
                "{} should stay text",
                raw
            );
        }
        assert_eq!(FieldValue::from_cell("0"), FieldValue::Integer(0));
    }

    #[test]
    fn test_field_value_non_finite_stays_text() {
        for raw in ["NaN", "inf", "-inf", "Infinity"] {
            assert!(
                matches!(FieldValue::from_cell(raw), FieldValue::Text(_)),
                "{} should stay text",
                raw
            );
        }
    }

    #[test]
    fn test_field_value_rendering() {
        assert_eq!(FieldValue::Integer(110001).as_text(), "110001");
        assert_eq!(FieldValue::Float(2.5).as_text(), "2.5");
        assert_eq!(FieldValue::from("ABCDE").as_text(), "ABCDE");
        assert!(FieldValue::from("   ").is_blank());
        assert!(!FieldValue::Integer(0).is_blank());
    }

    #[test]
    fn test_record_case_insensitive_lookup() {
        let record = Record::new()
            .with("State", "Kerala")
            .with("PINCODE", 682001)
            .with("district", "");

        assert_eq!(record.state().as_deref(), Some("Kerala"));
        assert_eq!(record.pincode().as_deref(), Some("682001"));
        assert!(record.district().is_none(), "blank text counts as missing");
        assert!(record.date().is_none());
        assert_eq!(record.number("pincode"), Some(682001.0));
    }

    #[test]
    fn test_record_exact_match_wins() {
        let record = Record::new().with("AGE", 40).with("age", 12);
        assert_eq!(record.number("age"), Some(12.0));
    }

    #[test]
    fn test_canonical_key_distinguishes_values() {
        let a = Record::new().with("state", "Goa").with("age", 30);
        let b = Record::new().with("state", "Goa").with("age", 31);
        let c = Record::new().with("age", 30).with("state", "Goa");
        assert_ne!(a.canonical_key(), b.canonical_key());
        assert_eq!(a.canonical_key(), c.canonical_key());
    }

    #[test]
    fn test_finding_serializes_camel_case() {
        let finding = AnomalyFinding {
            row: Record::new().with("pincode", "ABCDE"),
            index: 3,
            reasons: vec!["Malformed pincode".to_string()],
            detailed_reasons: vec![DetailedReason {
                feature: "pincode".to_string(),
                value: FieldValue::from("ABCDE"),
                explanation: "contains non-digit characters".to_string(),
                importance: 0.9,
            }],
            score: 0.9,
        };

        let json = serde_json::to_value(&finding).unwrap();
        assert_eq!(json["index"], 3);
        assert_eq!(json["row"]["pincode"], "ABCDE");
        assert_eq!(json["detailedReasons"][0]["feature"], "pincode");
        assert_eq!(json["detailedReasons"][0]["importance"], 0.9);
    }

    #[test]
    fn test_statistics_serialize_camel_case() {
        let stats = DatasetStatistics {
            total_rows: 2,
            anomaly_count: 1,
            anomaly_rate: 0.5,
            time_series: vec![DailyCount {
                date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
                count: 2,
            }],
            ..DatasetStatistics::default()
        };

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["totalRows"], 2);
        assert_eq!(json["anomalyRate"], 0.5);
        assert_eq!(json["timeSeries"][0]["date"], "2025-03-01");
        assert!(json["topStates"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_record_roundtrip_keeps_types() {
        let record = Record::new()
            .with("age", 30)
            .with("ratio", 0.25)
            .with("state", "Assam");
        let json = serde_json::to_string(&record).unwrap();
        let back: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(record, back);
    }
}
