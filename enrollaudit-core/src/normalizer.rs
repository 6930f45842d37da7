//! CSV normalization.
//!
//! Turns the text of one uploaded file into an ordered sequence of
//! [`Record`]s. Standard CSV quoting applies: a field wrapped in `"` may
//! contain commas and line breaks, and `""` inside it is a literal quote.
//!
//! # Malformed rows
//! A row is malformed when the reader cannot decode it or when it carries
//! non-empty cells beyond the header width. By default such rows are
//! skipped with a warning; [`NormalizerConfig::strict_rows`] turns the
//! whole run into an [`AuditError::MalformedRow`] instead.

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};

use crate::error::{AuditError, Result};
use crate::models::{FieldValue, PINCODE_FIELD, Record};

/// Normalizer settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NormalizerConfig {
    /// Fail the run on the first malformed row instead of skipping it
    pub strict_rows: bool,
}

impl NormalizerConfig {
    /// Creates a lenient config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to select strict row handling.
    pub fn with_strict_rows(mut self, strict: bool) -> Self {
        self.strict_rows = strict;
        self
    }
}

/// Records decoded from one file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedCsv {
    /// Records in file order
    pub records: Vec<Record>,
    /// Malformed rows dropped in lenient mode
    pub skipped_rows: u64,
}

/// CSV normalizer.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    config: NormalizerConfig,
}

impl Normalizer {
    /// Creates a normalizer with the given configuration.
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    /// Returns the normalizer configuration.
    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Parses the text of one CSV file.
    ///
    /// The first line is the header. A header-only or zero-byte input
    /// yields an empty [`ParsedCsv`]; rejecting empty uploads is the job of
    /// [`Normalizer::parse_all`].
    pub fn parse(&self, text: &str) -> Result<ParsedCsv> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = match reader.headers() {
            Ok(headers) => headers.iter().map(|h| h.trim().to_string()).collect(),
            Err(e) => {
                let mut parsed = ParsedCsv::default();
                self.on_malformed(line_of_error(&e), "header row could not be decoded", &mut parsed)?;
                return Ok(parsed);
            }
        };

        let mut parsed = ParsedCsv::default();

        for result in reader.records() {
            let row = match result {
                Ok(row) => row,
                Err(e) => {
                    self.on_malformed(line_of_error(&e), "row could not be decoded", &mut parsed)?;
                    continue;
                }
            };

            if row.iter().all(str::is_empty) {
                continue;
            }

            if has_overflow(&row, headers.len()) {
                let line = row.position().map_or(0, csv::Position::line);
                let reason = format!(
                    "row has {} cells but the header declares {}",
                    row.len(),
                    headers.len()
                );
                self.on_malformed(line, &reason, &mut parsed)?;
                continue;
            }

            parsed.records.push(build_record(&headers, &row));
        }

        tracing::debug!(
            records = parsed.records.len(),
            skipped = parsed.skipped_rows,
            columns = headers.len(),
            "Parsed CSV input"
        );

        Ok(parsed)
    }

    /// Parses several files and concatenates their records in the given
    /// order.
    ///
    /// # Errors
    /// [`AuditError::EmptyInput`] when no file contributes a record, and
    /// [`AuditError::MalformedRow`] in strict mode.
    pub fn parse_all<'a, I>(&self, texts: I) -> Result<Vec<Record>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut combined = Vec::new();
        let mut skipped: u64 = 0;

        for text in texts {
            let parsed = self.parse(text)?;
            skipped += parsed.skipped_rows;
            combined.extend(parsed.records);
        }

        if skipped > 0 {
            tracing::warn!("Skipped {} malformed rows across the upload", skipped);
        }

        if combined.is_empty() {
            return Err(AuditError::EmptyInput);
        }

        Ok(combined)
    }

    fn on_malformed(&self, line: u64, reason: &str, parsed: &mut ParsedCsv) -> Result<()> {
        if self.config.strict_rows {
            return Err(AuditError::malformed_row(line, reason));
        }
        tracing::warn!(line, "Skipping malformed row: {}", reason);
        parsed.skipped_rows += 1;
        Ok(())
    }
}

/// Parses one CSV text with default settings.
///
/// Malformed rows are skipped, so this never fails.
pub fn parse_csv(text: &str) -> Vec<Record> {
    Normalizer::default()
        .parse(text)
        .map(|parsed| parsed.records)
        .unwrap_or_default()
}

fn line_of_error(error: &csv::Error) -> u64 {
    error.position().map_or(0, csv::Position::line)
}

/// Extra cells are tolerated only when they are empty (trailing commas).
fn has_overflow(row: &StringRecord, width: usize) -> bool {
    row.len() > width && row.iter().skip(width).any(|cell| !cell.is_empty())
}

fn build_record(headers: &[String], row: &StringRecord) -> Record {
    let mut record = Record::new();
    for (name, cell) in headers.iter().zip(row.iter()) {
        if name.is_empty() {
            continue;
        }
        let value = match FieldValue::from_cell(cell) {
            // Pincodes are identifiers; `6.82001e5` must not read as 682001
            FieldValue::Float(_) if name.eq_ignore_ascii_case(PINCODE_FIELD) => {
                FieldValue::Text(cell.trim().to_string())
            }
            value => value,
        };
        record.insert(name.clone(), value);
    }
    record
}
