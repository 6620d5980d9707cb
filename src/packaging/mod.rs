//! Packaging hand-off queue and background worker.
//!
//! Downloading and packaging are decoupled: series workers push a
//! [`PackagingTask`] per completed chapter onto a [`PackagingQueue`], and a
//! single long-lived [`PackagingWorker`] drains the queue and invokes the
//! [`Packager`], so a slow archive step never stalls new downloads.
//!
//! # Shutdown
//!
//! Shutdown is a signal-then-join handshake. Producers drop their queue
//! handles when no further task can be produced; the controller then
//! cancels the stop token and joins the worker. The worker exits once the
//! channel reports closed-and-empty, or - after observing the stop signal -
//! once it has drained every task already queued. It never exits while
//! unprocessed tasks remain, and a task is consumed exactly once.
//!
//! Packaging failures are logged and the task is dropped; the chapter's
//! images stay on disk (deletion is contingent on a successful archive)
//! and the chapter is not re-added to the failure ledger.

mod cbz;

pub use cbz::CbzPackager;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// The unit placed on the packaging queue: one successfully downloaded
/// chapter awaiting archival.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagingTask {
    /// Directory containing the chapter's page images.
    pub chapter_dir: PathBuf,
    /// Series title as published (unsanitized).
    pub series_title: String,
    /// Numbered display title of the chapter.
    pub chapter_title: String,
}

/// Errors that can occur while packaging a chapter.
#[derive(Debug, Error)]
pub enum PackageError {
    /// File system error reading images or writing the archive.
    #[error("IO error packaging {path}: {source}")]
    Io {
        /// The path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The archive container could not be written.
    #[error("archive error for {path}: {source}")]
    Archive {
        /// The archive path being written.
        path: PathBuf,
        /// The underlying zip error.
        #[source]
        source: zip::result::ZipError,
    },

    /// The chapter directory contains no images to archive.
    #[error("no images found in {path}")]
    Empty {
        /// The empty chapter directory.
        path: PathBuf,
    },

    /// The blocking archive task was lost.
    #[error("archive task failed for {path}")]
    Background {
        /// The archive path being written.
        path: PathBuf,
        /// The underlying join error.
        #[source]
        source: tokio::task::JoinError,
    },
}

/// Archive-step collaborator invoked by the packaging worker.
#[async_trait]
pub trait Packager: Send + Sync {
    /// Archives one chapter directory. With `delete_images` set, the source
    /// images are removed - but only after the archive has been written
    /// successfully.
    async fn package(&self, task: &PackagingTask, delete_images: bool)
    -> Result<(), PackageError>;
}

/// Producer handle for the packaging queue.
///
/// Clonable; append-only. Dropping every handle closes the queue, which is
/// how producers signal "no further task will be produced."
#[derive(Debug, Clone)]
pub struct PackagingQueue {
    tx: mpsc::UnboundedSender<PackagingTask>,
}

impl PackagingQueue {
    /// Enqueues a completed chapter for packaging.
    ///
    /// Sending after the worker is gone cannot happen in a well-ordered
    /// shutdown; if it does, the task is logged and dropped.
    pub fn enqueue(&self, task: PackagingTask) {
        if let Err(e) = self.tx.send(task) {
            warn!(
                chapter = %e.0.chapter_title,
                "packaging queue closed; dropping task"
            );
        }
    }
}

/// Counters reported by the worker when it exits.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PackagingStats {
    /// Chapters archived successfully.
    pub packaged: usize,
    /// Chapters whose archive step failed (logged and dropped).
    pub failed: usize,
}

/// Single background consumer of the packaging queue.
pub struct PackagingWorker {
    rx: mpsc::UnboundedReceiver<PackagingTask>,
    packager: Arc<dyn Packager>,
    stop: CancellationToken,
}

impl PackagingWorker {
    /// Spawns the worker, returning the producer handle and the join
    /// handle that yields final [`PackagingStats`].
    #[must_use]
    pub fn spawn(
        packager: Arc<dyn Packager>,
        stop: CancellationToken,
    ) -> (PackagingQueue, JoinHandle<PackagingStats>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = Self { rx, packager, stop };
        let handle = tokio::spawn(worker.run());
        (PackagingQueue { tx }, handle)
    }

    async fn run(mut self) -> PackagingStats {
        debug!("packaging worker started");
        let mut stats = PackagingStats::default();

        loop {
            tokio::select! {
                maybe_task = self.rx.recv() => match maybe_task {
                    Some(task) => self.handle_task(task, &mut stats).await,
                    // All producers dropped and the queue is drained
                    None => break,
                },
                () = self.stop.cancelled() => {
                    // Stop observed: producers are done, so whatever is
                    // queued now is all that will ever arrive. Drain it,
                    // then exit.
                    while let Ok(task) = self.rx.try_recv() {
                        self.handle_task(task, &mut stats).await;
                    }
                    break;
                }
            }
        }

        info!(
            packaged = stats.packaged,
            failed = stats.failed,
            "packaging worker stopped"
        );
        stats
    }

    async fn handle_task(&self, task: PackagingTask, stats: &mut PackagingStats) {
        info!(
            series = %task.series_title,
            chapter = %task.chapter_title,
            "packaging chapter"
        );
        match self.packager.package(&task, true).await {
            Ok(()) => {
                stats.packaged += 1;
                info!(chapter = %task.chapter_title, "chapter packaged");
            }
            Err(e) => {
                stats.failed += 1;
                warn!(
                    chapter = %task.chapter_title,
                    error = %e,
                    "packaging failed; chapter images kept on disk"
                );
            }
        }
    }
}
