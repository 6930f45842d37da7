//! Hand-off to an external summarization service.
//!
//! The crate does not ship a summarizer. Hosts implement [`Summarizer`]
//! for whatever service writes the narrative fraud summary and receive a
//! [`SummaryRequest`] holding the most suspicious findings.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AuditError, Result};
use crate::models::AnomalyFinding;

/// Findings sent when no explicit cap is given.
pub const DEFAULT_SUMMARY_LIMIT: usize = 50;

/// Payload for one summarization call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRequest {
    /// Findings in the whole run, before the cap
    pub total_findings: usize,
    /// Highest-scoring findings, descending by score, ties by index
    pub findings: Vec<AnomalyFinding>,
}

impl SummaryRequest {
    /// Selects up to `limit` findings, most suspicious first.
    pub fn from_findings(findings: &[AnomalyFinding], limit: usize) -> Self {
        let mut ranked: Vec<&AnomalyFinding> = findings.iter().collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.index.cmp(&b.index)));
        Self {
            total_findings: findings.len(),
            findings: ranked.into_iter().take(limit).cloned().collect(),
        }
    }

    /// Serializes the payload as JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| AuditError::serialization("Failed to serialize summary request", e))
    }
}

/// External service that turns findings into a narrative summary.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Returns the summary text for `request`.
    ///
    /// Implementations report service failures as
    /// [`AuditError::Summarizer`].
    async fn summarize(&self, request: &SummaryRequest) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Record;

    fn finding(index: usize, score: f64) -> AnomalyFinding {
        AnomalyFinding {
            row: Record::new().with("pincode", "ABCDE"),
            index,
            reasons: vec!["Malformed pincode".to_string()],
            detailed_reasons: Vec::new(),
            score,
        }
    }

    #[test]
    fn test_from_findings_ranks_by_score_then_index() {
        let findings = vec![finding(0, 0.35), finding(1, 0.9), finding(2, 0.9), finding(3, 0.6)];
        let request = SummaryRequest::from_findings(&findings, DEFAULT_SUMMARY_LIMIT);
        let order: Vec<usize> = request.findings.iter().map(|f| f.index).collect();
        assert_eq!(order, vec![1, 2, 3, 0]);
        assert_eq!(request.total_findings, 4);
    }

    #[test]
    fn test_from_findings_caps_at_limit() {
        let findings: Vec<_> = (0..10).map(|i| finding(i, 0.5)).collect();
        let request = SummaryRequest::from_findings(&findings, 3);
        assert_eq!(request.findings.len(), 3);
        assert_eq!(request.total_findings, 10);
        assert_eq!(request.findings[2].index, 2);
    }

    #[test]
    fn test_to_json_uses_camel_case() {
        let request = SummaryRequest::from_findings(&[finding(4, 0.9)], 5);
        let json = request.to_json().unwrap();
        assert!(json.contains("\"totalFindings\": 1"));
        assert!(json.contains("\"detailedReasons\""));
    }

    struct CountingSummarizer;

    #[async_trait]
    impl Summarizer for CountingSummarizer {
        async fn summarize(&self, request: &SummaryRequest) -> Result<String> {
            Ok(format!("{} suspicious records", request.total_findings))
        }
    }

    #[tokio::test]
    async fn test_summarizer_trait_object() {
        let summarizer: Box<dyn Summarizer> = Box::new(CountingSummarizer);
        let request = SummaryRequest::from_findings(&[finding(0, 0.9)], 5);
        assert_eq!(
            summarizer.summarize(&request).await.unwrap(),
            "1 suspicious records"
        );
    }
}
