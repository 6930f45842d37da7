//! Enrollment audit tool.
//!
//! This binary reads enrollment CSV exports, flags suspicious records with
//! the heuristics of `enrollaudit-core` and writes a JSON or text report.
//!
//! # Privacy Guarantees
//! - Offline operation; no network access
//! - Log output carries counts and file names, never record values
//! - The summarization payload is written to a local file for the operator
//!   to hand over

use anyhow::Context;
use clap::Parser;
use enrollaudit::output::{ScanReport, render_text, write_output};
use enrollaudit::{Cli, Command, ConfigArgs, ReportFormat, ScanArgs, load_config, scan_config};
use enrollaudit_core::{AuditSession, SummaryRequest, logging::init_logging};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.global.verbose, cli.global.quiet)?;

    match &cli.command {
        Command::Scan(args) => scan(args).await,
        Command::Config(args) => show_config(args),
    }
}

/// Analyzes the given files and writes the report
async fn scan(args: &ScanArgs) -> anyhow::Result<()> {
    info!("Starting scan of {} files...", args.files.len());

    let config = scan_config(args)?;
    let mut session = AuditSession::new(config)?;
    session.login(args.operator.clone());

    let snapshot = session.upload_paths(&args.files).await.map_err(|e| {
        error!("Scan failed: {}", e);
        e
    })?;

    info!(
        "✓ Scan completed: {} records, {} flagged",
        snapshot.stats.total_rows, snapshot.stats.anomaly_count
    );

    let report = match args.format {
        ReportFormat::Json => ScanReport::new(snapshot, &args.files).to_json()?,
        ReportFormat::Text => render_text(snapshot),
    };
    write_output(&report, args.output.as_deref()).await?;
    if let Some(path) = &args.output {
        info!("✓ Report saved to {}", path.display());
    }

    if let Some(path) = &args.summary_payload {
        if snapshot.findings.is_empty() {
            warn!("No findings; summarization payload not written");
        } else {
            let request = SummaryRequest::from_findings(&snapshot.findings, args.summary_limit);
            let json = request.to_json()?;
            write_output(&json, Some(path.as_path()))
                .await
                .context("Failed to write summarization payload")?;
            info!(
                "✓ Summarization payload with {} findings saved to {}",
                request.findings.len(),
                path.display()
            );
        }
    }

    Ok(())
}

/// Prints the effective configuration
fn show_config(args: &ConfigArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_ref())?;
    let json =
        serde_json::to_string_pretty(&config).context("Failed to serialize configuration")?;
    println!("{}", json);
    Ok(())
}
