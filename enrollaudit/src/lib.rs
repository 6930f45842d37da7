//! Library module for enrollaudit
//!
//! This module exposes the CLI definition and report rendering for testing
//! purposes. The main binary functionality is in main.rs.

pub mod output;

use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use enrollaudit_core::{AuditConfig, DEFAULT_SUMMARY_LIMIT};

/// CLI argument structure
#[derive(Parser)]
#[command(name = "enrollaudit")]
#[command(about = "Audit enrollment CSV exports for suspicious records")]
#[command(version)]
#[command(long_about = "
enrollaudit - offline audit of enrollment CSV exports

Normalizes one or more CSV files, scores every record with fixed
heuristics and reports the flagged records with dataset statistics:
- Malformed pincodes and state/pincode mismatches
- District conflicts for a pincode
- Implausible ages and numeric outliers
- Future, early or out-of-range dates
- Duplicate rows and same-day enrollment bursts

PRIVACY:
- Nothing leaves the machine
- Log output never contains record values

EXAMPLES:
  enrollaudit scan district_a.csv district_b.csv
  enrollaudit scan --format text --as-of 2025-06-30 upload.csv
  enrollaudit scan --config audit.json --output report.json upload.csv
")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Command {
    /// Analyze CSV files and report anomalies
    Scan(ScanArgs),
    /// Print the effective configuration as JSON
    Config(ConfigArgs),
}

/// Arguments of the `scan` command
#[derive(Args)]
pub struct ScanArgs {
    /// CSV files, analyzed in the given order
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// JSON configuration file
    #[arg(short, long, value_name = "FILE", env = "ENROLLAUDIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Reference day for future-date checks (defaults to today, UTC)
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub as_of: Option<NaiveDate>,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Json)]
    pub format: ReportFormat,

    /// Write the report here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Fail on the first malformed row instead of skipping it
    #[arg(long)]
    pub strict: bool,

    /// Write the summarization payload for the flagged records here
    #[arg(long, value_name = "FILE")]
    pub summary_payload: Option<PathBuf>,

    /// Findings included in the summarization payload
    #[arg(long, default_value_t = DEFAULT_SUMMARY_LIMIT)]
    pub summary_limit: usize,

    /// Operator identifier recorded for the session
    #[arg(long, env = "ENROLLAUDIT_OPERATOR", default_value = "local")]
    pub operator: String,
}

/// Arguments of the `config` command
#[derive(Args)]
pub struct ConfigArgs {
    /// JSON configuration file to merge over the defaults
    #[arg(short, long, value_name = "FILE", env = "ENROLLAUDIT_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Global flags shared by every command
#[derive(Args)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(
        short,
        long,
        global = true,
        help = "Suppress all log output except errors"
    )]
    pub quiet: bool,
}

/// Report formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Full JSON report
    Json,
    /// Human-readable summary
    Text,
}

/// Loads the configuration file, if any, and applies command-line
/// overrides.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid JSON, or
/// holds invalid thresholds.
pub fn load_config(path: Option<&PathBuf>) -> anyhow::Result<AuditConfig> {
    match path {
        Some(path) => AuditConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => Ok(AuditConfig::default()),
    }
}

/// Builds the configuration for a scan.
///
/// # Errors
///
/// Returns an error if the configuration file cannot be loaded.
pub fn scan_config(args: &ScanArgs) -> anyhow::Result<AuditConfig> {
    let mut config = load_config(args.config.as_ref())?;
    if args.strict {
        config.normalizer.strict_rows = true;
    }
    if let Some(as_of) = args.as_of {
        config.detection.as_of = Some(as_of);
    }
    Ok(config)
}
