//! Core library for enrollaudit.
//!
//! This crate turns uploaded enrollment CSV exports into normalized records,
//! scores every record with a fixed set of heuristics, and aggregates the
//! dataset for dashboards and reports.
//!
//! # Privacy Guarantees
//! - Log output carries counts, line numbers and field names, never cell
//!   values
//! - Error messages name files and lines only
//! - Detection is offline; the summarization service is an optional
//!   host-provided collaborator
//!
//! # Architecture
//! - [`normalizer`]: CSV text to [`Record`] sequences
//! - [`detection`]: the [`AnomalyEngine`] and its configuration
//! - [`upload`] and [`session`]: file loading and the per-operator lifecycle
//! - [`summary`]: the hand-off contract for narrative summaries

pub mod config;
pub mod detection;
pub mod error;
pub mod logging;
pub mod models;
pub mod normalizer;
pub mod session;
pub mod summary;
pub mod upload;

// Re-export commonly used types
pub use config::AuditConfig;
pub use detection::{AnomalyEngine, AnomalySensitivity, DetectionConfig};
pub use error::{AuditError, Result};
pub use models::{
    AgeBucketCount, AnomalyFinding, DailyCount, DatasetStatistics, DetailedReason,
    DetectionReport, FieldValue, PincodeCount, Record, StateCount,
};
pub use normalizer::{Normalizer, NormalizerConfig, ParsedCsv, parse_csv};
pub use session::{AnalysisSnapshot, AnalysisStatus, AuditSession};
pub use summary::{DEFAULT_SUMMARY_LIMIT, Summarizer, SummaryRequest};
pub use upload::{UploadedFile, load_uploads, normalize_uploads};
