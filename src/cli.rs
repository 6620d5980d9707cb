//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use seriesdl::{DEFAULT_PAGE_CONCURRENCY, DEFAULT_SERIES_CONCURRENCY};

/// Batch download and package episodic series content.
///
/// Given series manifest URLs, seriesdl downloads every chapter's page
/// images with bounded parallelism, packages completed chapters into CBZ
/// archives in the background, and records failed chapters for a retry
/// pass at the end of the batch.
#[derive(Parser, Debug)]
#[command(name = "seriesdl")]
#[command(author, version, about)]
pub struct Args {
    /// Series identifiers (manifest URLs)
    pub identifiers: Vec<String>,

    /// File with one series identifier per line (blank lines skipped)
    #[arg(short, long)]
    pub input_file: Option<PathBuf>,

    /// Root output directory
    #[arg(short, long, default_value = "output")]
    pub output: PathBuf,

    /// Maximum series processed concurrently (1-16)
    #[arg(short = 's', long, default_value_t = DEFAULT_SERIES_CONCURRENCY as u8, value_parser = clap::value_parser!(u8).range(1..=16))]
    pub series_concurrency: u8,

    /// Maximum concurrent page downloads per chapter (1-100)
    #[arg(short = 'c', long, default_value_t = DEFAULT_PAGE_CONCURRENCY as u8, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub page_concurrency: u8,

    /// Cooldown in seconds after a series finishes with failures (0 to disable, max 3600)
    #[arg(short = 'w', long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(0..=3600))]
    pub cooldown: u64,

    /// Failure ledger path (defaults to failed_chapters.json under the output directory)
    #[arg(long)]
    pub ledger: Option<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}
