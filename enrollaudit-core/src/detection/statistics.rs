//! Dataset-level aggregates.
//!
//! Only `anomaly_count` and `anomaly_rate` depend on the findings; the
//! distributions are computed over every record.

use std::collections::{BTreeMap, HashMap};

use crate::models::{
    AgeBucketCount, DailyCount, DatasetStatistics, PincodeCount, Record, StateCount,
};

use super::config::{DetectionConfig, UNKNOWN_AGE_BUCKET};
use super::dates::parse_date;

/// Computes the aggregates for `records` given the number of findings.
pub fn compute_statistics(
    records: &[Record],
    anomaly_count: usize,
    config: &DetectionConfig,
) -> DatasetStatistics {
    let total_rows = records.len() as u64;
    let anomaly_count = anomaly_count as u64;
    let anomaly_rate = if total_rows == 0 {
        0.0
    } else {
        anomaly_count as f64 / total_rows as f64
    };

    let mut top_states: Vec<StateCount> = ranked_counts(records.iter().map(Record::state))
        .into_iter()
        .map(|(name, value)| StateCount { name, value })
        .collect();
    top_states.truncate(config.top_states_limit);

    let mut pincode_heatmap: Vec<PincodeCount> =
        ranked_counts(records.iter().map(Record::pincode))
            .into_iter()
            .map(|(pincode, count)| PincodeCount { pincode, count })
            .collect();
    if let Some(limit) = config.pincode_heatmap_limit {
        pincode_heatmap.truncate(limit);
    }

    DatasetStatistics {
        total_rows,
        anomaly_count,
        anomaly_rate,
        top_states,
        pincode_heatmap,
        age_distribution: age_distribution(records, config),
        time_series: time_series(records),
    }
}

/// Counts values, descending by count with ties in first-seen order.
fn ranked_counts<'a, I>(values: I) -> Vec<(String, u64)>
where
    I: Iterator<Item = Option<std::borrow::Cow<'a, str>>>,
{
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<(String, u64)> = Vec::new();

    for value in values.flatten() {
        match positions.get(&*value) {
            Some(&position) => counts[position].1 += 1,
            None => {
                positions.insert(value.to_string(), counts.len());
                counts.push((value.into_owned(), 1));
            }
        }
    }

    // Stable sort keeps first-seen order among equal counts.
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

fn age_distribution(records: &[Record], config: &DetectionConfig) -> Vec<AgeBucketCount> {
    let mut counts = vec![0u64; config.age_buckets.len()];
    let mut unknown = 0u64;

    for record in records {
        let bucket = record
            .number(&config.age_field)
            .filter(|age| *age >= 0.0)
            .and_then(|age| config.age_buckets.iter().position(|b| b.contains(age)));
        match bucket {
            Some(position) => counts[position] += 1,
            None => unknown += 1,
        }
    }

    config
        .age_buckets
        .iter()
        .zip(counts)
        .map(|(bucket, count)| AgeBucketCount {
            range: bucket.label.clone(),
            count,
        })
        .chain(std::iter::once(AgeBucketCount {
            range: UNKNOWN_AGE_BUCKET.to_string(),
            count: unknown,
        }))
        .collect()
}

fn time_series(records: &[Record]) -> Vec<DailyCount> {
    let mut days: BTreeMap<chrono::NaiveDate, u64> = BTreeMap::new();
    for day in records
        .iter()
        .filter_map(|record| record.date().and_then(|raw| parse_date(&raw)))
    {
        *days.entry(day).or_insert(0) += 1;
    }
    days.into_iter()
        .map(|(date, count)| DailyCount { date, count })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::config::AgeBucket;
    use chrono::NaiveDate;

    fn enrollee(state: &str, pincode: &str, age: i64, date: &str) -> Record {
        Record::new()
            .with("state", state)
            .with("pincode", pincode)
            .with("age", age)
            .with("date", date)
    }

    #[test]
    fn test_empty_dataset() {
        let stats = compute_statistics(&[], 0, &DetectionConfig::default());
        assert_eq!(stats.total_rows, 0);
        assert_eq!(stats.anomaly_rate, 0.0);
        assert!(stats.top_states.is_empty());
        assert!(stats.pincode_heatmap.is_empty());
        assert!(stats.time_series.is_empty());
        assert_eq!(stats.age_distribution.len(), 6);
        assert!(stats.age_distribution.iter().all(|b| b.count == 0));
    }

    #[test]
    fn test_anomaly_rate() {
        let records: Vec<Record> = (0..4)
            .map(|_| enrollee("Goa", "403001", 30, "2025-03-01"))
            .collect();
        let stats = compute_statistics(&records, 1, &DetectionConfig::default());
        assert_eq!(stats.total_rows, 4);
        assert_eq!(stats.anomaly_count, 1);
        assert_eq!(stats.anomaly_rate, 0.25);
    }

    #[test]
    fn test_top_states_ties_keep_first_seen_order() {
        let records = vec![
            enrollee("Bihar", "800001", 30, "2025-03-01"),
            enrollee("Goa", "403001", 30, "2025-03-01"),
            enrollee("Goa", "403001", 30, "2025-03-01"),
            enrollee("Assam", "781001", 30, "2025-03-01"),
            enrollee("Bihar", "800001", 30, "2025-03-01"),
            Record::new().with("state", ""),
        ];
        let stats = compute_statistics(&records, 0, &DetectionConfig::default());
        let names: Vec<&str> = stats.top_states.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Bihar", "Goa", "Assam"]);
        assert_eq!(stats.top_states[0].value, 2);
    }

    #[test]
    fn test_top_states_truncated_to_limit() {
        let records: Vec<Record> = (0..15)
            .map(|i| Record::new().with("state", format!("State {}", i).as_str()))
            .collect();
        let stats = compute_statistics(&records, 0, &DetectionConfig::default());
        assert_eq!(stats.top_states.len(), 10);

        let config = DetectionConfig::new().with_top_states_limit(3);
        let stats = compute_statistics(&records, 0, &config);
        assert_eq!(stats.top_states.len(), 3);
        assert_eq!(stats.pincode_heatmap.len(), 0);
    }

    #[test]
    fn test_pincode_heatmap_counts_text() {
        let records = vec![
            enrollee("Goa", "403001", 30, "2025-03-01"),
            Record::new().with("pincode", 403001),
            enrollee("Goa", "ABCDE", 30, "2025-03-01"),
        ];
        let stats = compute_statistics(&records, 0, &DetectionConfig::default());
        assert_eq!(
            stats.pincode_heatmap[0],
            PincodeCount {
                pincode: "403001".to_string(),
                count: 2
            }
        );
        assert_eq!(stats.pincode_heatmap[1].pincode, "ABCDE");

        let config = DetectionConfig::new().with_pincode_heatmap_limit(Some(1));
        assert_eq!(compute_statistics(&records, 0, &config).pincode_heatmap.len(), 1);
    }

    #[test]
    fn test_age_distribution_sums_to_total() {
        let records = vec![
            enrollee("Goa", "403001", 0, "2025-03-01"),
            enrollee("Goa", "403001", 17, "2025-03-01"),
            enrollee("Goa", "403001", 18, "2025-03-01"),
            enrollee("Goa", "403001", 44, "2025-03-01"),
            enrollee("Goa", "403001", 60, "2025-03-01"),
            enrollee("Goa", "403001", 150, "2025-03-01"),
            enrollee("Goa", "403001", -3, "2025-03-01"),
            Record::new().with("age", "unknown"),
            Record::new().with("state", "Goa"),
        ];
        let stats = compute_statistics(&records, 0, &DetectionConfig::default());
        let counts: Vec<(&str, u64)> = stats
            .age_distribution
            .iter()
            .map(|b| (b.range.as_str(), b.count))
            .collect();
        assert_eq!(
            counts,
            vec![
                ("0-18", 2),
                ("18-30", 1),
                ("30-45", 1),
                ("45-60", 0),
                ("60+", 2),
                ("Unknown", 3),
            ]
        );
        let sum: u64 = stats.age_distribution.iter().map(|b| b.count).sum();
        assert_eq!(sum, stats.total_rows);
    }

    #[test]
    fn test_fractional_ages_follow_half_open_labels() {
        let records = vec![
            Record::new().with("age", 17.5),
            Record::new().with("age", 29.9),
            Record::new().with("age", 30.0),
        ];
        let stats = compute_statistics(&records, 0, &DetectionConfig::default());
        let count = |label: &str| {
            stats
                .age_distribution
                .iter()
                .find(|b| b.range == label)
                .map(|b| b.count)
        };
        assert_eq!(count("0-18"), Some(1));
        assert_eq!(count("18-30"), Some(1));
        assert_eq!(count("30-45"), Some(1));
    }

    #[test]
    fn test_age_outside_custom_buckets_is_unknown() {
        let config = DetectionConfig::new()
            .with_age_buckets(vec![AgeBucket::new("adult", 18.0, Some(65.0))]);
        let records = vec![Record::new().with("age", 70), Record::new().with("age", 40)];
        let stats = compute_statistics(&records, 0, &config);
        assert_eq!(stats.age_distribution[0].count, 1);
        assert_eq!(stats.age_distribution[1].range, "Unknown");
        assert_eq!(stats.age_distribution[1].count, 1);
    }

    #[test]
    fn test_time_series_ascending_without_unparseable() {
        let records = vec![
            enrollee("Goa", "403001", 30, "2025-03-02"),
            enrollee("Goa", "403001", 30, "01/03/2025"),
            enrollee("Goa", "403001", 30, "2025-03-01"),
            enrollee("Goa", "403001", 30, "someday"),
        ];
        let stats = compute_statistics(&records, 0, &DetectionConfig::default());
        assert_eq!(
            stats.time_series,
            vec![
                DailyCount {
                    date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
                    count: 2
                },
                DailyCount {
                    date: NaiveDate::from_ymd_opt(2025, 3, 2).unwrap(),
                    count: 1
                },
            ]
        );
        assert_eq!(stats.total_rows, 4);
    }
}
