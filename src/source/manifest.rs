//! JSON-manifest reference source.
//!
//! Treats a series identifier as the URL of a JSON document describing the
//! series, with each chapter URL pointing at a second document listing its
//! page images:
//!
//! ```text
//! series manifest:  {"title": "...", "chapters": [{"url": "...", "title": "..."}]}
//! chapter manifest: {"pages": ["https://.../001.jpg", ...]}
//! ```
//!
//! This keeps the full pipeline exercisable (and integration-testable
//! against a mock HTTP server) without carrying any site scraping logic.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{ChapterDescriptor, FetchError, SeriesInfo, SeriesSource};

/// Connect timeout for manifest requests.
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Total request timeout for manifest requests.
const REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Deserialize)]
struct SeriesManifest {
    title: String,
    chapters: Vec<ChapterEntry>,
}

#[derive(Debug, Deserialize)]
struct ChapterEntry {
    url: String,
    title: String,
}

#[derive(Debug, Deserialize)]
struct ChapterManifest {
    pages: Vec<String>,
}

/// [`SeriesSource`] that fetches JSON manifests over HTTP.
#[derive(Debug, Clone)]
pub struct ManifestSource {
    client: Client,
}

impl ManifestSource {
    /// Creates a manifest source with default timeouts.
    #[must_use]
    pub fn new() -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client }
    }

    /// Creates a manifest source from a preconfigured client.
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn fetch_json<T>(&self, url: &str) -> Result<T, FetchError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_request(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::http_status(url, status.as_u16()));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| FetchError::parse(url, e.to_string()))
    }
}

impl Default for ManifestSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SeriesSource for ManifestSource {
    async fn fetch_metadata(&self, identifier: &str) -> Result<SeriesInfo, FetchError> {
        if Url::parse(identifier).is_err() {
            return Err(FetchError::invalid_identifier(identifier));
        }

        let manifest: SeriesManifest = self.fetch_json(identifier).await?;
        debug!(
            identifier,
            title = %manifest.title,
            chapters = manifest.chapters.len(),
            "fetched series manifest"
        );

        Ok(SeriesInfo {
            title: manifest.title,
            chapters: manifest
                .chapters
                .into_iter()
                .map(|entry| ChapterDescriptor {
                    url: entry.url,
                    title: entry.title,
                })
                .collect(),
        })
    }

    async fn chapter_pages(&self, chapter_url: &str) -> Result<Vec<String>, FetchError> {
        let manifest: ChapterManifest = self.fetch_json(chapter_url).await?;
        debug!(
            chapter_url,
            pages = manifest.pages.len(),
            "fetched chapter manifest"
        );
        Ok(manifest.pages)
    }
}
