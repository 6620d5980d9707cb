//! HTTP client wrapper for downloading page images.
//!
//! Streams response bodies straight to disk so large pages never sit in
//! memory. Designed to be created once and cloned into page tasks, taking
//! advantage of connection pooling.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;
use url::Url;

use super::error::DownloadError;

/// Connect timeout for page requests.
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Read timeout for page requests (generous for large images on slow hosts).
const READ_TIMEOUT_SECS: u64 = 120;

/// HTTP client for streaming page downloads.
#[derive(Debug, Clone)]
pub struct PageClient {
    client: Client,
}

impl PageClient {
    /// Creates a new page client with default timeouts.
    #[must_use]
    pub fn new() -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(READ_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client }
    }

    /// Creates a page client from a preconfigured reqwest client.
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Downloads one page image to `dest`, returning the bytes written.
    ///
    /// The destination is created (truncating any partial file from a
    /// previous failed attempt) and the body is streamed through a buffered
    /// writer.
    ///
    /// # Errors
    ///
    /// Returns a [`DownloadError`] if the URL is invalid, the request fails
    /// or times out, the server responds with a non-success status, or the
    /// file cannot be written.
    pub async fn download_page(&self, url: &str, dest: &Path) -> Result<u64, DownloadError> {
        Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::from_request(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }

        let file = File::create(dest)
            .await
            .map_err(|e| DownloadError::io(dest, e))?;
        let mut writer = BufWriter::new(file);
        let mut stream = response.bytes_stream();
        let mut bytes_written: u64 = 0;

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.map_err(|e| DownloadError::from_request(url, e))?;
            writer
                .write_all(&chunk)
                .await
                .map_err(|e| DownloadError::io(dest, e))?;
            bytes_written += chunk.len() as u64;
        }

        writer
            .flush()
            .await
            .map_err(|e| DownloadError::io(dest, e))?;

        debug!(url, bytes = bytes_written, path = %dest.display(), "page downloaded");
        Ok(bytes_written)
    }
}

impl Default for PageClient {
    fn default() -> Self {
        Self::new()
    }
}
