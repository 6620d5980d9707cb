//! Whole-chapter download with a bounded page-fetch pool.
//!
//! # Concurrency Model
//!
//! - Each page fetch runs in its own Tokio task
//! - A fresh semaphore per chapter bounds in-flight pages (RAII permits),
//!   so the configured limit applies per chapter rather than across series
//! - Every started page runs to completion; the chapter result is reported
//!   only after all page tasks have been joined (no hard cancellation)
//!
//! # Failure Semantics
//!
//! A chapter succeeds only if the page list could be fetched and every page
//! downloaded. Any page failure fails the chapter as a whole; partial files
//! are left in place and overwritten by a later retry.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, warn};
use url::Url;

use super::client::PageClient;
use super::error::DownloadError;
use crate::sanitize::sanitize;
use crate::source::SeriesSource;

/// Minimum zero-pad width for page ordinals.
const MIN_PAGE_PAD: usize = 3;

/// Extension used when one cannot be derived from the page URL.
const FALLBACK_EXTENSION: &str = ".jpg";

/// Downloads all page images for one chapter.
pub struct ChapterDownloader {
    source: Arc<dyn SeriesSource>,
    client: PageClient,
    concurrency: usize,
}

impl ChapterDownloader {
    /// Creates a downloader fetching at most `concurrency` pages at once.
    ///
    /// Values below 1 are clamped to 1.
    #[must_use]
    pub fn new(source: Arc<dyn SeriesSource>, client: PageClient, concurrency: usize) -> Self {
        Self {
            source,
            client,
            concurrency: concurrency.max(1),
        }
    }

    /// Returns the configured page concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Downloads one chapter into
    /// `output_root/sanitize(series_title)/sanitize(chapter_title)/`.
    ///
    /// Pages are written as zero-padded ordinals (`001.jpg`, `002.png`, ...)
    /// in the order the source reports them. Returns the chapter directory
    /// on success.
    ///
    /// # Errors
    ///
    /// Returns a [`DownloadError`] if page discovery fails, the chapter has
    /// no pages, the chapter directory cannot be created, or any page fails
    /// to download.
    pub async fn download(
        &self,
        chapter_url: &str,
        series_title: &str,
        chapter_title: &str,
        output_root: &Path,
    ) -> Result<PathBuf, DownloadError> {
        let pages = self
            .source
            .chapter_pages(chapter_url)
            .await
            .map_err(|e| DownloadError::pages(chapter_url, e))?;

        if pages.is_empty() {
            return Err(DownloadError::no_pages(chapter_url));
        }

        let chapter_dir = output_root
            .join(sanitize(series_title))
            .join(sanitize(chapter_title));
        tokio::fs::create_dir_all(&chapter_dir)
            .await
            .map_err(|e| DownloadError::io(chapter_dir.clone(), e))?;

        debug!(
            chapter_url,
            pages = pages.len(),
            dir = %chapter_dir.display(),
            "downloading chapter pages"
        );

        let pad = pages.len().to_string().len().max(MIN_PAGE_PAD);
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::with_capacity(pages.len());

        for (index, page_url) in pages.into_iter().enumerate() {
            // Acquire before spawning so at most `concurrency` tasks run
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| DownloadError::PoolClosed)?;

            let client = self.client.clone();
            let dest = chapter_dir.join(page_filename(index + 1, pad, &page_url));

            handles.push(tokio::spawn(async move {
                // Permit is dropped when this block exits (RAII)
                let _permit = permit;
                client
                    .download_page(&page_url, &dest)
                    .await
                    .map(|_| ())
                    .map_err(|e| (page_url, e))
            }));
        }

        // Join everything before reporting: in-flight pages always run to
        // completion, and the chapter outcome reflects all of them.
        let mut first_error: Option<DownloadError> = None;
        let mut failed_pages = 0usize;
        for handle in handles {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err((page_url, e))) => {
                    warn!(page = %page_url, error = %e, "page download failed");
                    failed_pages += 1;
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
                Err(e) => {
                    warn!(error = %e, "page task panicked");
                    failed_pages += 1;
                    if first_error.is_none() {
                        first_error = Some(DownloadError::TaskFailed {
                            url: chapter_url.to_string(),
                        });
                    }
                }
            }
        }

        if let Some(error) = first_error {
            warn!(chapter_url, failed_pages, "chapter download failed");
            return Err(error);
        }

        Ok(chapter_dir)
    }
}

/// Builds a zero-padded page filename with an extension derived from the URL.
fn page_filename(number: usize, pad: usize, page_url: &str) -> String {
    let extension =
        extension_from_url(page_url).unwrap_or_else(|| FALLBACK_EXTENSION.to_string());
    format!("{number:0pad$}{extension}")
}

/// Extracts a plausible file extension (with leading dot) from a URL path.
fn extension_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let last_segment = parsed.path_segments()?.next_back()?;
    let dot_index = last_segment.rfind('.')?;
    let ext = &last_segment[dot_index..];
    if ext.len() <= 1 || ext.len() > 6 {
        return None;
    }
    ext.chars()
        .skip(1)
        .all(|c| c.is_ascii_alphanumeric())
        .then(|| ext.to_lowercase())
}
