//! CLI entry point for the seriesdl tool.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use seriesdl::{BatchConfig, BatchController, CbzPackager, ManifestSource};
use tracing::{debug, info, warn};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    // Assemble identifiers: positional args plus the input file, if any
    let mut identifiers = args.identifiers.clone();
    if let Some(path) = &args.input_file {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("cannot read input file {}", path.display()))?;
        identifiers.extend(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(ToString::to_string),
        );
    }

    if identifiers.is_empty() {
        info!("No series identifiers provided.");
        info!("Example: seriesdl https://example.com/series.json");
        return Ok(ExitCode::SUCCESS);
    }

    info!(series = identifiers.len(), "seriesdl starting");

    let mut config = BatchConfig::new(args.output.clone());
    config.series_concurrency = usize::from(args.series_concurrency);
    config.page_concurrency = usize::from(args.page_concurrency);
    config.cooldown = Duration::from_secs(args.cooldown);
    if let Some(ledger) = args.ledger.clone() {
        config.ledger_path = ledger;
    }

    let controller = BatchController::new(
        Arc::new(ManifestSource::new()),
        Arc::new(CbzPackager::new()),
        config,
    );
    let summary = controller.run(&identifiers).await;

    if summary.fully_succeeded() {
        info!(
            downloaded = summary.chapters_downloaded,
            packaged = summary.chapters_packaged,
            "all downloads and packaging complete"
        );
        Ok(ExitCode::SUCCESS)
    } else {
        warn!(
            still_failed = summary.chapters_failed,
            "some chapters remain failed; see the failure ledger"
        );
        Ok(ExitCode::FAILURE)
    }
}
