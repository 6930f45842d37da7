//! Error types for upload, normalization and detection.
//!
//! Enrollment records carry personal data, so no error message in this
//! module ever embeds a cell value. Errors name files, line numbers and
//! field names only.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Main error type for enrollaudit operations.
///
/// Any variant aborts the whole upload; the caller keeps whatever result it
/// held before the failed run.
#[derive(Debug, Error)]
pub enum AuditError {
    /// An uploaded file could not be read or is not valid UTF-8
    #[error("Could not read file: {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Every uploaded file parsed to zero records
    #[error("File is empty: no data rows found in the uploaded input")]
    EmptyInput,

    /// A row could not be decoded (strict mode only)
    #[error("Malformed row at line {line}: {reason}")]
    MalformedRow { line: u64, reason: String },

    /// Configuration or validation error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Report serialization failed
    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// An upload was attempted without an active session
    #[error("Not logged in: log in before uploading files")]
    Unauthenticated,

    /// The summarization collaborator reported a failure
    #[error("Summarization failed: {context}")]
    Summarizer { context: String },
}

/// Convenience type alias for Results with AuditError
pub type Result<T> = std::result::Result<T, AuditError>;

impl AuditError {
    /// Creates a read error for the given file
    pub fn read_failed(path: impl AsRef<Path>, error: std::io::Error) -> Self {
        Self::Read {
            path: path.as_ref().to_path_buf(),
            source: error,
        }
    }

    /// Creates a malformed row error
    pub fn malformed_row(line: u64, reason: impl Into<String>) -> Self {
        Self::MalformedRow {
            line,
            reason: reason.into(),
        }
    }

    /// Creates a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a serialization error with context
    pub fn serialization(context: impl Into<String>, error: serde_json::Error) -> Self {
        Self::Serialization {
            context: context.into(),
            source: error,
        }
    }

    /// Creates a summarizer error
    pub fn summarizer(context: impl Into<String>) -> Self {
        Self::Summarizer {
            context: context.into(),
        }
    }
}
