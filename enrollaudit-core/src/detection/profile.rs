//! Dataset-wide context computed once per run.
//!
//! Several heuristics judge a record against the rest of the upload
//! (column means, the date range, the district a pincode usually belongs
//! to, earlier identical rows, same-day volume). [`DatasetProfile`] holds
//! those aggregates so each rule stays a pure function of
//! `(record, index, profile, config)`.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;

use crate::models::{MANDATORY_FIELDS, Record};

use super::config::DetectionConfig;
use super::dates::{day_ordinal, parse_date};
use super::geo::normalize_region_name;

/// Mean and population standard deviation of one numeric column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnStats {
    /// Mean value
    pub mean: f64,
    /// Population standard deviation
    pub std_dev: f64,
    /// Number of values the statistics were computed from
    pub samples: usize,
}

impl ColumnStats {
    /// Absolute z-score of `value`.
    pub fn z_score(&self, value: f64) -> f64 {
        (value - self.mean).abs() / self.std_dev
    }
}

/// Dominant district of a pincode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistrictMajority {
    /// District as first written in the upload
    pub district: String,
    /// Normalized form used for comparison
    pub normalized: String,
    /// Rows naming this district
    pub rows: u64,
    /// Rows carrying both this pincode and a district
    pub total: u64,
}

/// Aggregates shared by the heuristics of one run.
#[derive(Debug, Clone, Default)]
pub struct DatasetProfile {
    /// Statistics for numeric columns eligible for outlier checks
    pub numeric_columns: BTreeMap<String, ColumnStats>,
    /// Statistics over parsed dates as day ordinals
    pub dates: Option<ColumnStats>,
    /// Majority district per pincode
    pub pincode_districts: HashMap<String, DistrictMajority>,
    /// For each record, the index of an earlier identical record
    pub duplicate_of: Vec<Option<usize>>,
    /// For each record, the size of its (day, pincode, operator) group
    pub burst_group_sizes: Vec<Option<u64>>,
    /// Mean size of those groups
    pub mean_burst_group: f64,
}

/// Columns are skipped when std dev falls below this.
const MIN_STD_DEV: f64 = 1e-10;

/// Columns need this many numeric values for meaningful statistics.
const MIN_SAMPLES: usize = 3;

impl DatasetProfile {
    /// Builds the profile for `records`.
    pub fn build(records: &[Record], config: &DetectionConfig) -> Self {
        let profile = Self {
            numeric_columns: numeric_column_stats(records, config),
            dates: date_stats(records),
            pincode_districts: pincode_majorities(records, config),
            duplicate_of: duplicate_indices(records),
            ..Self::default()
        };
        profile.with_burst_groups(records, config)
    }

    fn with_burst_groups(mut self, records: &[Record], config: &DetectionConfig) -> Self {
        let keys: Vec<Option<BurstKey>> = records
            .iter()
            .map(|record| burst_key(record, config))
            .collect();

        let mut sizes: HashMap<&BurstKey, u64> = HashMap::new();
        for key in keys.iter().flatten() {
            *sizes.entry(key).or_insert(0) += 1;
        }

        let keyed_rows: u64 = sizes.values().sum();
        self.mean_burst_group = if sizes.is_empty() {
            0.0
        } else {
            keyed_rows as f64 / sizes.len() as f64
        };
        self.burst_group_sizes = keys
            .iter()
            .map(|key| key.as_ref().and_then(|k| sizes.get(k).copied()))
            .collect();
        self
    }
}

/// Calculates mean and population standard deviation for a set of values.
///
/// Uses population standard deviation (divides by n, not n-1); the bias is
/// small and slightly conservative for outlier detection.
pub fn calculate_statistics(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;

    (mean, variance.sqrt())
}

fn column_stats(values: &[f64]) -> Option<ColumnStats> {
    if values.len() < MIN_SAMPLES {
        return None;
    }
    let (mean, std_dev) = calculate_statistics(values);
    if std_dev < MIN_STD_DEV {
        return None;
    }
    Some(ColumnStats {
        mean,
        std_dev,
        samples: values.len(),
    })
}

/// True for columns that other heuristics already own.
pub(crate) fn is_reserved_column(name: &str, config: &DetectionConfig) -> bool {
    let name = name.trim();
    MANDATORY_FIELDS
        .iter()
        .any(|field| name.eq_ignore_ascii_case(field))
        || name.eq_ignore_ascii_case(&config.age_field)
        || config
            .operator_fields
            .iter()
            .any(|field| name.eq_ignore_ascii_case(field))
}

fn numeric_column_stats(
    records: &[Record],
    config: &DetectionConfig,
) -> BTreeMap<String, ColumnStats> {
    // Union of columns across rows: files in one upload may differ.
    let columns: BTreeSet<&str> = records
        .iter()
        .flat_map(|record| record.fields().map(|(name, _)| name))
        .filter(|name| !is_reserved_column(name, config))
        .collect();

    columns
        .into_iter()
        .filter_map(|column| {
            let values: Vec<f64> = records
                .iter()
                .filter_map(|record| record.get(column).and_then(|v| v.as_f64()))
                .collect();
            column_stats(&values).map(|stats| (column.to_string(), stats))
        })
        .collect()
}

fn date_stats(records: &[Record]) -> Option<ColumnStats> {
    let ordinals: Vec<f64> = records
        .iter()
        .filter_map(|record| record.date().and_then(|raw| parse_date(&raw)))
        .map(day_ordinal)
        .collect();
    column_stats(&ordinals)
}

fn pincode_majorities(
    records: &[Record],
    config: &DetectionConfig,
) -> HashMap<String, DistrictMajority> {
    // pincode -> normalized district -> (first spelling, rows), first-seen order
    let mut counts: HashMap<String, Vec<(String, String, u64)>> = HashMap::new();

    for record in records {
        let (Some(pincode), Some(district)) = (record.pincode(), record.district()) else {
            continue;
        };
        let normalized = normalize_region_name(&district);
        let entries = counts.entry(pincode.into_owned()).or_default();
        match entries.iter_mut().find(|(_, n, _)| *n == normalized) {
            Some(entry) => entry.2 += 1,
            None => entries.push((district.into_owned(), normalized, 1)),
        }
    }

    counts
        .into_iter()
        .filter_map(|(pincode, entries)| {
            let total: u64 = entries.iter().map(|(_, _, rows)| rows).sum();
            if total < config.pincode_district_min_rows {
                return None;
            }
            let (district, normalized, rows) = entries
                .into_iter()
                .reduce(|best, next| if next.2 > best.2 { next } else { best })?;
            // Strict majority only; a tie names no district.
            (rows * 2 > total).then_some((
                pincode,
                DistrictMajority {
                    district,
                    normalized,
                    rows,
                    total,
                },
            ))
        })
        .collect()
}

fn duplicate_indices(records: &[Record]) -> Vec<Option<usize>> {
    let mut first_seen: HashMap<String, usize> = HashMap::new();
    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let key = record.canonical_key();
            match first_seen.get(&key) {
                Some(&first) => Some(first),
                None => {
                    first_seen.insert(key, index);
                    None
                }
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BurstKey {
    day: NaiveDate,
    pincode: String,
    operators: Vec<String>,
}

fn burst_key(record: &Record, config: &DetectionConfig) -> Option<BurstKey> {
    let day = record.date().and_then(|raw| parse_date(&raw))?;
    let pincode = record.pincode()?.into_owned();
    let operators = config
        .operator_fields
        .iter()
        .filter_map(|field| record.text(field).map(|v| v.into_owned()))
        .collect();
    Some(BurstKey {
        day,
        pincode,
        operators,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(date: &str, state: &str, district: &str, pincode: i64) -> Record {
        Record::new()
            .with("date", date)
            .with("state", state)
            .with("district", district)
            .with("pincode", pincode)
    }

    #[test]
    fn test_calculate_statistics() {
        let (mean, std_dev) = calculate_statistics(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((mean - 5.0).abs() < 1e-9);
        assert!((std_dev - 2.0).abs() < 1e-9);
        assert_eq!(calculate_statistics(&[]), (0.0, 0.0));
    }

    #[test]
    fn test_numeric_columns_skip_reserved_and_flat_columns() {
        let records: Vec<Record> = (0..5)
            .map(|i| {
                row("2025-03-01", "Goa", "North Goa", 403001)
                    .with("age", 20 + i)
                    .with("operator_id", 9000 + i)
                    .with("constant", 7)
                    .with("updates", i)
            })
            .collect();

        let profile = DatasetProfile::build(&records, &DetectionConfig::default());

        assert!(profile.numeric_columns.contains_key("updates"));
        assert!(!profile.numeric_columns.contains_key("pincode"));
        assert!(!profile.numeric_columns.contains_key("age"));
        assert!(!profile.numeric_columns.contains_key("operator_id"));
        assert!(!profile.numeric_columns.contains_key("constant"));
    }

    #[test]
    fn test_numeric_columns_need_three_values() {
        let records = vec![
            Record::new().with("updates", 1),
            Record::new().with("updates", 100),
        ];
        let profile = DatasetProfile::build(&records, &DetectionConfig::default());
        assert!(profile.numeric_columns.is_empty());
    }

    #[test]
    fn test_pincode_majority_requires_strict_majority() {
        let mut records = vec![
            row("2025-03-01", "Kerala", "Ernakulam", 682001),
            row("2025-03-01", "Kerala", "ERNAKULAM", 682001),
            row("2025-03-01", "Kerala", "Thrissur", 682001),
        ];
        let profile = DatasetProfile::build(&records, &DetectionConfig::default());
        let majority = &profile.pincode_districts["682001"];
        assert_eq!(majority.district, "Ernakulam");
        assert_eq!(majority.rows, 2);
        assert_eq!(majority.total, 3);

        records.push(row("2025-03-01", "Kerala", "Thrissur", 682001));
        let profile = DatasetProfile::build(&records, &DetectionConfig::default());
        assert!(!profile.pincode_districts.contains_key("682001"));
    }

    #[test]
    fn test_pincode_majority_respects_min_rows() {
        let records = vec![
            row("2025-03-01", "Kerala", "Ernakulam", 682001),
            row("2025-03-01", "Kerala", "Ernakulam", 682001),
        ];
        let profile = DatasetProfile::build(&records, &DetectionConfig::default());
        assert!(profile.pincode_districts.is_empty());
    }

    #[test]
    fn test_duplicate_indices_point_at_first_occurrence() {
        let a = row("2025-03-01", "Goa", "North Goa", 403001);
        let b = row("2025-03-02", "Goa", "North Goa", 403001);
        let records = vec![a.clone(), b.clone(), a.clone(), a];
        let profile = DatasetProfile::build(&records, &DetectionConfig::default());
        assert_eq!(profile.duplicate_of, vec![None, None, Some(0), Some(0)]);
    }

    #[test]
    fn test_burst_groups() {
        let mut records: Vec<Record> = (0..4)
            .map(|_| row("2025-03-01", "Goa", "North Goa", 403001))
            .collect();
        records.push(row("2025-03-02", "Goa", "North Goa", 403001));
        records.push(Record::new().with("state", "Goa"));

        let profile = DatasetProfile::build(&records, &DetectionConfig::default());

        assert_eq!(profile.burst_group_sizes[0], Some(4));
        assert_eq!(profile.burst_group_sizes[4], Some(1));
        assert_eq!(profile.burst_group_sizes[5], None);
        assert!((profile.mean_burst_group - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_burst_groups_split_by_operator() {
        let records = vec![
            row("2025-03-01", "Goa", "North Goa", 403001).with("operator_id", "OP1"),
            row("2025-03-01", "Goa", "North Goa", 403001).with("operator_id", "OP2"),
        ];
        let profile = DatasetProfile::build(&records, &DetectionConfig::default());
        assert_eq!(profile.burst_group_sizes, vec![Some(1), Some(1)]);
    }

    #[test]
    fn test_date_stats_ignore_unparseable() {
        let records = vec![
            row("2025-03-01", "Goa", "North Goa", 403001),
            row("2025-03-03", "Goa", "North Goa", 403001),
            row("not a date", "Goa", "North Goa", 403001),
            row("2025-03-05", "Goa", "North Goa", 403001),
        ];
        let profile = DatasetProfile::build(&records, &DetectionConfig::default());
        let dates = profile.dates.unwrap();
        assert_eq!(dates.samples, 3);
    }
}
