//! Reading uploaded files.
//!
//! Files are read concurrently but always handed to the normalizer in the
//! order they were selected.

use std::path::{Path, PathBuf};

use futures::future::try_join_all;

use crate::error::{AuditError, Result};
use crate::models::Record;
use crate::normalizer::{Normalizer, NormalizerConfig};

/// Text of one uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Display name, usually the path the file was read from
    pub name: String,
    /// Full UTF-8 contents
    pub text: String,
}

impl UploadedFile {
    /// Wraps text that is already in memory.
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    /// Reads one file as UTF-8.
    ///
    /// # Errors
    /// [`AuditError::Read`] naming the file when it cannot be opened or is
    /// not valid UTF-8.
    pub async fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AuditError::read_failed(path, e))?;
        let text = String::from_utf8(bytes).map_err(|e| {
            AuditError::read_failed(
                path,
                std::io::Error::new(std::io::ErrorKind::InvalidData, e.utf8_error()),
            )
        })?;

        tracing::debug!("Read {} bytes from {}", text.len(), path.display());
        Ok(Self::new(path.display().to_string(), text))
    }
}

/// Reads every file in `paths`, preserving the given order.
///
/// The first failure aborts the whole upload.
pub async fn load_uploads<P>(paths: &[P]) -> Result<Vec<UploadedFile>>
where
    P: AsRef<Path>,
{
    let paths: Vec<PathBuf> = paths.iter().map(|p| p.as_ref().to_path_buf()).collect();
    let files = try_join_all(paths.iter().map(|path| UploadedFile::read(path))).await?;
    tracing::debug!("Loaded {} uploaded files", files.len());
    Ok(files)
}

/// Normalizes uploaded files into one record sequence, file by file.
///
/// # Errors
/// [`AuditError::EmptyInput`] when no file yields a record, and
/// [`AuditError::MalformedRow`] in strict mode.
pub fn normalize_uploads(files: &[UploadedFile], config: &NormalizerConfig) -> Result<Vec<Record>> {
    Normalizer::new(config.clone()).parse_all(files.iter().map(|file| file.text.as_str()))
}
