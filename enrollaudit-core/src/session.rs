//! Audit session state.
//!
//! An [`AuditSession`] follows one operator from login to logout. Each
//! successful upload produces a fresh [`AnalysisSnapshot`] that replaces the
//! previous one as a whole; a failed upload keeps the previous snapshot and
//! records the error message.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuditConfig;
use crate::detection::AnomalyEngine;
use crate::error::{AuditError, Result};
use crate::models::{AnomalyFinding, DatasetStatistics, Record};
use crate::summary::{Summarizer, SummaryRequest};
use crate::upload::{UploadedFile, load_uploads, normalize_uploads};

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalysisStatus {
    /// No operator logged in
    Unauthenticated,
    /// Logged in, nothing analyzed yet
    Idle,
    /// An upload is being analyzed
    Processing,
    /// The last upload was analyzed
    Completed,
    /// The last upload failed
    Error,
}

/// Result of one successful upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSnapshot {
    /// Unique id of the run
    pub run_id: Uuid,
    /// When the run finished
    pub analyzed_at: DateTime<Utc>,
    /// Every normalized record, in upload order
    pub records: Vec<Record>,
    /// Flagged records
    pub findings: Vec<AnomalyFinding>,
    /// Dataset aggregates
    pub stats: DatasetStatistics,
}

/// One operator's audit session.
#[derive(Debug)]
pub struct AuditSession {
    config: AuditConfig,
    status: AnalysisStatus,
    operator: Option<String>,
    snapshot: Option<AnalysisSnapshot>,
    last_error: Option<String>,
}

impl AuditSession {
    /// Creates a logged-out session after validating `config`.
    pub fn new(config: AuditConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            status: AnalysisStatus::Unauthenticated,
            operator: None,
            snapshot: None,
            last_error: None,
        })
    }

    /// Returns the session configuration.
    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Current lifecycle status.
    pub fn status(&self) -> AnalysisStatus {
        self.status
    }

    /// Identifier of the logged-in operator.
    pub fn operator(&self) -> Option<&str> {
        self.operator.as_deref()
    }

    /// The current analysis, if any upload has succeeded.
    pub fn snapshot(&self) -> Option<&AnalysisSnapshot> {
        self.snapshot.as_ref()
    }

    /// Message of the last failed upload, cleared by the next success.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Starts the session for `identifier`.
    ///
    /// Credentials are not verified here; only the identifier is kept.
    pub fn login(&mut self, identifier: impl Into<String>) {
        self.operator = Some(identifier.into());
        self.status = AnalysisStatus::Idle;
        tracing::info!("Session started");
    }

    /// Ends the session and discards every analysis result.
    pub fn logout(&mut self) {
        self.operator = None;
        self.snapshot = None;
        self.last_error = None;
        self.status = AnalysisStatus::Unauthenticated;
        tracing::info!("Session ended");
    }

    /// Analyzes files that are already in memory.
    pub fn upload_texts(&mut self, files: &[UploadedFile]) -> Result<&AnalysisSnapshot> {
        self.begin_upload()?;
        let outcome = self.analyze(files);
        self.finish_upload(outcome)
    }

    /// Reads `paths` concurrently and analyzes them in the given order.
    pub async fn upload_paths<P>(&mut self, paths: &[P]) -> Result<&AnalysisSnapshot>
    where
        P: AsRef<Path>,
    {
        self.begin_upload()?;
        let outcome = match load_uploads(paths).await {
            Ok(files) => self.analyze(&files),
            Err(e) => Err(e),
        };
        self.finish_upload(outcome)
    }

    /// Asks `summarizer` for a narrative of the current findings.
    ///
    /// Returns `Ok(None)` when there is no snapshot or it has no findings;
    /// the collaborator is not called in that case.
    pub async fn summarize(
        &self,
        summarizer: &dyn Summarizer,
        limit: usize,
    ) -> Result<Option<String>> {
        let Some(snapshot) = self.snapshot.as_ref().filter(|s| !s.findings.is_empty()) else {
            return Ok(None);
        };
        let request = SummaryRequest::from_findings(&snapshot.findings, limit);
        tracing::debug!(
            "Requesting summary for {} of {} findings",
            request.findings.len(),
            request.total_findings
        );
        summarizer.summarize(&request).await.map(Some)
    }

    fn begin_upload(&mut self) -> Result<()> {
        if self.operator.is_none() {
            return Err(AuditError::Unauthenticated);
        }
        self.status = AnalysisStatus::Processing;
        Ok(())
    }

    fn analyze(&self, files: &[UploadedFile]) -> Result<AnalysisSnapshot> {
        let records = normalize_uploads(files, &self.config.normalizer)?;

        let analyzed_at = Utc::now();
        let mut detection = self.config.detection.clone();
        if detection.as_of.is_none() {
            detection.as_of = Some(analyzed_at.date_naive());
        }
        let report = AnomalyEngine::try_new(detection)?.detect(&records);

        Ok(AnalysisSnapshot {
            run_id: Uuid::new_v4(),
            analyzed_at,
            records,
            findings: report.findings,
            stats: report.stats,
        })
    }

    fn finish_upload(&mut self, outcome: Result<AnalysisSnapshot>) -> Result<&AnalysisSnapshot> {
        match outcome {
            Ok(snapshot) => {
                tracing::info!(
                    "✓ Analyzed {} records, {} flagged",
                    snapshot.stats.total_rows,
                    snapshot.stats.anomaly_count
                );
                self.status = AnalysisStatus::Completed;
                self.last_error = None;
                Ok(self.snapshot.insert(snapshot))
            }
            Err(e) => {
                tracing::warn!("Upload failed: {}", e);
                self.status = AnalysisStatus::Error;
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }
}
