//! Top-level batch controller.
//!
//! Runs every series identifier through the [`SeriesOrchestrator`] with a
//! bounded series pool, aggregates failures, runs one retry pass over the
//! failure ledger, then drains the packaging queue and shuts the worker
//! down cleanly. All pipeline state (queue handle, stop token, ledger) is
//! constructed per run, never at process scope.
//!
//! # Concurrency
//!
//! Two-level bound: at most [`BatchConfig::series_concurrency`] series run
//! at once (default 2), and each chapter download internally bounds its
//! page fetches to [`BatchConfig::page_concurrency`] (default 10). A series
//! that finished with failures serves the configured cooldown inside its
//! pool slot before releasing it, throttling new scheduling pressure
//! without stalling healthy series.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::download::{ChapterDownloader, PageClient};
use crate::ledger::{FailureLedger, FailureRecord};
use crate::orchestrator::SeriesOrchestrator;
use crate::packaging::{Packager, PackagingQueue, PackagingStats, PackagingTask, PackagingWorker};
use crate::source::SeriesSource;

/// Default number of series processed concurrently.
pub const DEFAULT_SERIES_CONCURRENCY: usize = 2;

/// Default number of page images fetched concurrently per chapter.
pub const DEFAULT_PAGE_CONCURRENCY: usize = 10;

/// Default cooldown served after a series finishes with failures.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(10);

/// Name of the ledger file placed under the output root by default.
const DEFAULT_LEDGER_FILE: &str = "failed_chapters.json";

/// Configuration for one batch run.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Root directory for all series output.
    pub output_root: PathBuf,
    /// Location of the failure ledger.
    pub ledger_path: PathBuf,
    /// Maximum series processed at once.
    pub series_concurrency: usize,
    /// Maximum concurrent page fetches per chapter.
    pub page_concurrency: usize,
    /// Delay served in-slot after a series produced failures.
    pub cooldown: Duration,
}

impl BatchConfig {
    /// Creates a config with default limits, placing the ledger under the
    /// output root.
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        let output_root = output_root.into();
        let ledger_path = output_root.join(DEFAULT_LEDGER_FILE);
        Self {
            output_root,
            ledger_path,
            series_concurrency: DEFAULT_SERIES_CONCURRENCY,
            page_concurrency: DEFAULT_PAGE_CONCURRENCY,
            cooldown: DEFAULT_COOLDOWN,
        }
    }
}

/// Final counts for one batch run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    /// Chapters downloaded successfully (and handed to packaging).
    pub chapters_downloaded: usize,
    /// Chapters packaged successfully.
    pub chapters_packaged: usize,
    /// Chapters whose packaging failed (images kept on disk).
    pub packaging_failures: usize,
    /// Chapters still failed after the retry pass.
    pub chapters_failed: usize,
}

impl BatchSummary {
    /// True when no chapter remains in the failure ledger.
    #[must_use]
    pub fn fully_succeeded(&self) -> bool {
        self.chapters_failed == 0
    }
}

/// Top-level driver for a batch of series.
pub struct BatchController {
    source: Arc<dyn SeriesSource>,
    packager: Arc<dyn Packager>,
    config: BatchConfig,
}

impl BatchController {
    /// Creates a controller over the given collaborators.
    #[must_use]
    pub fn new(
        source: Arc<dyn SeriesSource>,
        packager: Arc<dyn Packager>,
        config: BatchConfig,
    ) -> Self {
        Self {
            source,
            packager,
            config,
        }
    }

    /// Runs the full batch: series pool, retry pass, queue drain, shutdown.
    ///
    /// Individual failures never abort the batch; the summary carries the
    /// final counts and [`BatchSummary::fully_succeeded`] decides the
    /// process exit status.
    pub async fn run(&self, identifiers: &[String]) -> BatchSummary {
        let ledger = Arc::new(FailureLedger::new(&self.config.ledger_path));
        let carried = ledger.load().await;
        if !carried.is_empty() {
            info!(
                count = carried.len(),
                "loaded failed chapters from a previous run"
            );
        }

        let stop = CancellationToken::new();
        let (queue, worker) = PackagingWorker::spawn(Arc::clone(&self.packager), stop.clone());

        let downloader = Arc::new(ChapterDownloader::new(
            Arc::clone(&self.source),
            PageClient::new(),
            self.config.page_concurrency,
        ));
        let orchestrator = Arc::new(SeriesOrchestrator::new(
            Arc::clone(&self.source),
            Arc::clone(&downloader),
            queue.clone(),
            Arc::clone(&ledger),
            self.config.output_root.clone(),
        ));

        self.run_series_pool(identifiers, &orchestrator).await;

        // Retry pass: reload the ledger and attempt each record directly,
        // bypassing metadata fetch (the chapter URL is already known).
        let outstanding = ledger.load().await;
        let remaining = self.retry_failed(&outstanding, &downloader, &queue).await;
        if let Err(e) = ledger.save(remaining.clone()).await {
            warn!(error = %e, "failed to persist failure ledger after retry pass");
        }

        // All producers are done: drop the queue handles, signal stop, and
        // wait for the worker to finish draining.
        drop(orchestrator);
        drop(queue);
        stop.cancel();
        let stats = match worker.await {
            Ok(stats) => stats,
            Err(e) => {
                warn!(error = %e, "packaging worker panicked");
                PackagingStats::default()
            }
        };

        let summary = BatchSummary {
            chapters_downloaded: stats.packaged + stats.failed,
            chapters_packaged: stats.packaged,
            packaging_failures: stats.failed,
            chapters_failed: remaining.len(),
        };
        info!(
            downloaded = summary.chapters_downloaded,
            packaged = summary.chapters_packaged,
            packaging_failures = summary.packaging_failures,
            still_failed = summary.chapters_failed,
            "batch complete"
        );
        summary
    }

    /// Runs all identifiers through the orchestrator with bounded
    /// concurrency, serving the cooldown inside slots that produced
    /// failures.
    async fn run_series_pool(&self, identifiers: &[String], orchestrator: &Arc<SeriesOrchestrator>) {
        let semaphore = Arc::new(Semaphore::new(self.config.series_concurrency.max(1)));
        let mut handles = Vec::with_capacity(identifiers.len());

        for identifier in identifiers {
            // Acquire before spawning so at most N series run at once
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                warn!("series pool closed unexpectedly");
                break;
            };

            let orchestrator = Arc::clone(orchestrator);
            let cooldown = self.config.cooldown;
            let identifier = identifier.clone();

            handles.push(tokio::spawn(async move {
                // Permit is dropped when this block exits (RAII)
                let _permit = permit;

                let failures = orchestrator.run(&identifier).await;
                if !failures.is_empty() {
                    warn!(
                        identifier = %identifier,
                        failed = failures.len(),
                        cooldown_secs = cooldown.as_secs(),
                        "series finished with failures; cooling down before freeing the slot"
                    );
                    tokio::time::sleep(cooldown).await;
                }
            }));
        }

        for handle in handles {
            // Task panics are logged but don't fail the batch
            if let Err(e) = handle.await {
                warn!(error = %e, "series task panicked");
            }
        }
    }

    /// Attempts each failed chapter once more, enqueuing successes.
    /// Returns the records that failed again.
    async fn retry_failed(
        &self,
        records: &[FailureRecord],
        downloader: &ChapterDownloader,
        queue: &PackagingQueue,
    ) -> Vec<FailureRecord> {
        if records.is_empty() {
            info!("no failed chapters to retry");
            return Vec::new();
        }

        info!(count = records.len(), "retrying failed chapters");
        let mut remaining = Vec::new();

        for record in records {
            match downloader
                .download(
                    &record.chapter_url,
                    &record.series_title,
                    &record.chapter_title,
                    &self.config.output_root,
                )
                .await
            {
                Ok(chapter_dir) => {
                    info!(chapter = %record.chapter_title, "retry succeeded");
                    queue.enqueue(PackagingTask {
                        chapter_dir,
                        series_title: record.series_title.clone(),
                        chapter_title: record.chapter_title.clone(),
                    });
                }
                Err(e) => {
                    warn!(
                        chapter = %record.chapter_title,
                        error = %e,
                        "retry failed"
                    );
                    remaining.push(record.clone());
                }
            }
        }

        if remaining.is_empty() {
            info!("all previously failed chapters retried successfully");
        } else {
            warn!(count = remaining.len(), "chapters still failed after retry");
        }
        remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_config_defaults() {
        let config = BatchConfig::new("output");
        assert_eq!(config.series_concurrency, DEFAULT_SERIES_CONCURRENCY);
        assert_eq!(config.page_concurrency, DEFAULT_PAGE_CONCURRENCY);
        assert_eq!(config.cooldown, DEFAULT_COOLDOWN);
        assert_eq!(
            config.ledger_path,
            PathBuf::from("output").join("failed_chapters.json")
        );
    }

    #[test]
    fn test_batch_summary_success_condition() {
        let mut summary = BatchSummary::default();
        assert!(summary.fully_succeeded());

        summary.chapters_failed = 1;
        assert!(!summary.fully_succeeded());

        // Packaging failures are best-effort and do not fail the batch
        summary.chapters_failed = 0;
        summary.packaging_failures = 3;
        assert!(summary.fully_succeeded());
    }

    #[test]
    fn test_default_concurrency_constants() {
        assert_eq!(DEFAULT_SERIES_CONCURRENCY, 2);
        assert_eq!(DEFAULT_PAGE_CONCURRENCY, 10);
        assert_eq!(DEFAULT_COOLDOWN, Duration::from_secs(10));
    }
}
