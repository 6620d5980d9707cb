//! Per-series orchestration: metadata, numbering, downloads, routing.
//!
//! [`SeriesOrchestrator::run`] processes one series end to end and never
//! lets an error escape: a metadata failure skips the series (it is not a
//! chapter failure and is not retried), a chapter failure is recorded in
//! the ledger and the loop continues. The caller gets back exactly the
//! failure records accumulated for this pass.
//!
//! # Numbering
//!
//! Chapters are numbered 1-based in the order the source reports them
//! (published order), zero-padded to the width of the total chapter count
//! with a minimum of two digits. Prefixes are therefore unique within a
//! series and monotonic with published order, and the same chapter list
//! always produces the same names.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::download::ChapterDownloader;
use crate::ledger::{FailureLedger, FailureRecord};
use crate::packaging::{PackagingQueue, PackagingTask};
use crate::sanitize::sanitize;
use crate::source::{ChapterDescriptor, SeriesSource};

/// Minimum zero-pad width for chapter prefixes.
const MIN_PREFIX_WIDTH: usize = 2;

/// A chapter with its deterministic sequence prefix and display title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberedChapter {
    /// Zero-padded 1-based position in the chapter list.
    pub prefix: String,
    /// The underlying chapter descriptor.
    pub descriptor: ChapterDescriptor,
    /// `"{prefix}_{sanitize(title)}"` - the on-disk chapter name.
    pub display_title: String,
}

/// Assigns zero-padded sequence prefixes to a chapter list.
///
/// The pad width is the number of digits in the total chapter count,
/// with a minimum of two.
#[must_use]
pub fn number_chapters(chapters: &[ChapterDescriptor]) -> Vec<NumberedChapter> {
    let width = chapters.len().to_string().len().max(MIN_PREFIX_WIDTH);
    chapters
        .iter()
        .enumerate()
        .map(|(index, descriptor)| {
            let position = index + 1;
            let prefix = format!("{position:0width$}");
            let display_title = format!("{prefix}_{}", sanitize(&descriptor.title));
            NumberedChapter {
                prefix,
                descriptor: descriptor.clone(),
                display_title,
            }
        })
        .collect()
}

/// Drives all chapters of one series through download and hand-off.
pub struct SeriesOrchestrator {
    source: Arc<dyn SeriesSource>,
    downloader: Arc<ChapterDownloader>,
    queue: PackagingQueue,
    ledger: Arc<FailureLedger>,
    output_root: PathBuf,
}

impl SeriesOrchestrator {
    /// Creates an orchestrator writing under `output_root`.
    #[must_use]
    pub fn new(
        source: Arc<dyn SeriesSource>,
        downloader: Arc<ChapterDownloader>,
        queue: PackagingQueue,
        ledger: Arc<FailureLedger>,
        output_root: PathBuf,
    ) -> Self {
        Self {
            source,
            downloader,
            queue,
            ledger,
            output_root,
        }
    }

    /// Processes one series and returns the chapters that failed.
    ///
    /// Successful chapters are enqueued for packaging exactly once;
    /// failed chapters are appended to the ledger (persisted immediately)
    /// and returned. A metadata fetch failure or empty chapter list yields
    /// an empty result. Nothing propagates upward as an error.
    pub async fn run(&self, identifier: &str) -> Vec<FailureRecord> {
        info!(identifier, "fetching series metadata");
        let series = match self.source.fetch_metadata(identifier).await {
            Ok(series) => series,
            Err(e) => {
                warn!(identifier, error = %e, "failed to fetch series metadata; skipping series");
                return Vec::new();
            }
        };

        if series.chapters.is_empty() {
            info!(series = %series.title, "no chapters found");
            return Vec::new();
        }

        let series_dir = self.output_root.join(sanitize(&series.title));
        if let Err(e) = tokio::fs::create_dir_all(&series_dir).await {
            warn!(
                series = %series.title,
                dir = %series_dir.display(),
                error = %e,
                "cannot create series directory; skipping series"
            );
            return Vec::new();
        }

        let numbered = number_chapters(&series.chapters);
        let total = numbered.len();
        let mut failures = Vec::new();

        for (index, chapter) in numbered.iter().enumerate() {
            info!(
                series = %series.title,
                chapter = %chapter.display_title,
                position = index + 1,
                total,
                "downloading chapter"
            );

            match self
                .downloader
                .download(
                    &chapter.descriptor.url,
                    &series.title,
                    &chapter.display_title,
                    &self.output_root,
                )
                .await
            {
                Ok(chapter_dir) => {
                    self.queue.enqueue(PackagingTask {
                        chapter_dir,
                        series_title: series.title.clone(),
                        chapter_title: chapter.display_title.clone(),
                    });
                }
                Err(e) => {
                    warn!(
                        series = %series.title,
                        chapter = %chapter.display_title,
                        error = %e,
                        "chapter download failed"
                    );
                    let record = FailureRecord {
                        series_title: series.title.clone(),
                        chapter_title: chapter.display_title.clone(),
                        chapter_url: chapter.descriptor.url.clone(),
                    };
                    // Persist immediately so a crash mid-batch loses nothing
                    if let Err(le) = self.ledger.record(record.clone()).await {
                        warn!(error = %le, "failed to persist failure ledger");
                    }
                    failures.push(record);
                }
            }
        }

        info!(
            series = %series.title,
            downloaded = total - failures.len(),
            failed = failures.len(),
            "series complete"
        );
        failures
    }
}
