//! Batch series acquisition and packaging pipeline.
//!
//! This library drives bulk downloads of episodic content: for each series
//! identifier it fetches metadata, downloads chapter page images through a
//! bounded worker pool, and hands completed chapters to a background
//! packaging stage that archives them and reclaims disk space. Failures are
//! contained at the chapter/series boundary and recorded in a durable
//! failure ledger so interrupted or throttled work can be retried later.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`source`] - Collaborator contracts for metadata and page discovery
//! - [`download`] - Page client and semaphore-bounded chapter downloader
//! - [`ledger`] - Persistent record of chapters that failed to download
//! - [`packaging`] - Hand-off queue and background packaging worker
//! - [`orchestrator`] - Per-series download orchestration
//! - [`batch`] - Top-level batch controller and retry pass
//! - [`sanitize`] - Filesystem-safe name mapping

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod batch;
pub mod download;
pub mod ledger;
pub mod orchestrator;
pub mod packaging;
pub mod sanitize;
pub mod source;

// Re-export commonly used types
pub use batch::{
    BatchConfig, BatchController, BatchSummary, DEFAULT_COOLDOWN, DEFAULT_PAGE_CONCURRENCY,
    DEFAULT_SERIES_CONCURRENCY,
};
pub use download::{ChapterDownloader, DownloadError, PageClient};
pub use ledger::{FailureLedger, FailureRecord, LedgerError};
pub use orchestrator::{NumberedChapter, SeriesOrchestrator, number_chapters};
pub use packaging::{
    CbzPackager, PackageError, Packager, PackagingQueue, PackagingStats, PackagingTask,
    PackagingWorker,
};
pub use sanitize::sanitize;
pub use source::{ChapterDescriptor, FetchError, ManifestSource, SeriesInfo, SeriesSource};
