//! Report rendering and file output.
//!
//! Handles turning an analysis snapshot into JSON or text and writing it to
//! a file or stdout.

use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use enrollaudit_core::{AnalysisSnapshot, AnomalyFinding, DatasetStatistics};
use serde::Serialize;

/// Findings listed in a text report before it is truncated.
const TEXT_FINDINGS_LIMIT: usize = 25;

/// The JSON report written by `scan`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport<'a> {
    /// Run identifier
    pub run_id: String,
    /// When the run finished
    pub analyzed_at: DateTime<Utc>,
    /// Input files in analysis order
    pub files: &'a [PathBuf],
    /// Dataset aggregates
    pub stats: &'a DatasetStatistics,
    /// Flagged records in input order
    pub findings: &'a [AnomalyFinding],
}

impl<'a> ScanReport<'a> {
    /// Builds the report for one snapshot.
    pub fn new(snapshot: &'a AnalysisSnapshot, files: &'a [PathBuf]) -> Self {
        Self {
            run_id: snapshot.run_id.to_string(),
            analyzed_at: snapshot.analyzed_at,
            files,
            stats: &snapshot.stats,
            findings: &snapshot.findings,
        }
    }

    /// Serializes the report as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize report")
    }
}

/// Renders a human-readable summary of a snapshot.
pub fn render_text(snapshot: &AnalysisSnapshot) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail
    write_text(&mut out, snapshot).unwrap_or_default();
    out
}

fn write_text(out: &mut String, snapshot: &AnalysisSnapshot) -> fmt::Result {
    let stats = &snapshot.stats;

    writeln!(out, "Run {}", snapshot.run_id)?;
    writeln!(out, "Records analyzed: {}", stats.total_rows)?;
    writeln!(
        out,
        "Anomalies: {} ({:.2}%)",
        stats.anomaly_count,
        stats.anomaly_rate * 100.0
    )?;

    if !stats.top_states.is_empty() {
        writeln!(out, "\nTop states:")?;
        for state in &stats.top_states {
            writeln!(out, "  {:<30} {}", state.name, state.value)?;
        }
    }

    writeln!(out, "\nAge distribution:")?;
    for bucket in &stats.age_distribution {
        writeln!(out, "  {:<8} {}", bucket.range, bucket.count)?;
    }

    if let (Some(first), Some(last)) = (stats.time_series.first(), stats.time_series.last()) {
        writeln!(
            out,
            "\nEnrollment days: {} ({} to {})",
            stats.time_series.len(),
            first.date,
            last.date
        )?;
    }

    if snapshot.findings.is_empty() {
        return writeln!(out, "\nNo suspicious records found.");
    }

    writeln!(out, "\nFindings:")?;
    for finding in snapshot.findings.iter().take(TEXT_FINDINGS_LIMIT) {
        writeln!(
            out,
            "  row {:>6}  score {:.2}  {}",
            finding.index,
            finding.score,
            finding.reasons.join("; ")
        )?;
    }
    if snapshot.findings.len() > TEXT_FINDINGS_LIMIT {
        writeln!(
            out,
            "  ... and {} more (use --format json for the full list)",
            snapshot.findings.len() - TEXT_FINDINGS_LIMIT
        )?;
    }
    Ok(())
}

/// Writes `contents` to `path`, or to stdout when no path is given.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub async fn write_output(contents: &str, path: Option<&Path>) -> anyhow::Result<()> {
    match path {
        Some(path) => tokio::fs::write(path, contents)
            .await
            .with_context(|| format!("Failed to write to {}", path.display())),
        None => {
            println!("{}", contents.trim_end());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use enrollaudit_core::{AuditConfig, AuditSession, UploadedFile};

    fn snapshot(csv: &str) -> AnalysisSnapshot {
        let mut session = AuditSession::new(AuditConfig::default()).unwrap();
        session.login("tester");
        session
            .upload_texts(&[UploadedFile::new("upload.csv", csv)])
            .unwrap()
            .clone()
    }

    #[test]
    fn test_json_report_shape() {
        let snapshot = snapshot("state,district,pincode,age\nGoa,North Goa,ABCDE,30\n");
        let files = vec![PathBuf::from("upload.csv")];
        let json = ScanReport::new(&snapshot, &files).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["runId"], snapshot.run_id.to_string());
        assert_eq!(value["files"][0], "upload.csv");
        assert_eq!(value["stats"]["totalRows"], 1);
        assert_eq!(value["findings"][0]["reasons"][0], "Malformed pincode");
    }

    #[test]
    fn test_text_report_lists_findings() {
        let snapshot = snapshot(
            "date,state,district,pincode,age\n2025-03-01,Goa,North Goa,ABCDE,30\n2025-03-02,Goa,North Goa,403001,31\n",
        );
        let text = render_text(&snapshot);

        assert!(text.contains("Records analyzed: 2"));
        assert!(text.contains("Anomalies: 1 (50.00%)"));
        assert!(text.contains("Goa"));
        assert!(text.contains("Enrollment days: 2 (2025-03-01 to 2025-03-02)"));
        assert!(text.contains("score 0.90  Malformed pincode"));
    }

    #[test]
    fn test_text_report_without_findings() {
        let snapshot = snapshot("state,pincode\nGoa,403001\n");
        assert!(render_text(&snapshot).contains("No suspicious records found."));
    }

    #[test]
    fn test_text_report_truncates_long_finding_lists() {
        let mut csv = String::from("state,pincode\n");
        for i in 0..30 {
            csv.push_str(&format!("Goa,X{}\n", i));
        }
        let snapshot = snapshot(&csv);
        let text = render_text(&snapshot);

        assert_eq!(text.matches("Malformed pincode").count(), TEXT_FINDINGS_LIMIT);
        assert!(text.ends_with("... and 5 more (use --format json for the full list)\n"));
    }

    #[tokio::test]
    async fn test_write_output_to_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("report.json");
        write_output("{}", Some(path.as_path())).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }
}
