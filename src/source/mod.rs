//! Collaborator contracts for remote series metadata and page discovery.
//!
//! The pipeline core never talks to a remote site directly; everything
//! site-specific (protocol, HTML parsing) lives behind [`SeriesSource`].
//! A source answers two questions: what chapters does a series have
//! ([`SeriesSource::fetch_metadata`]), and which page images make up one
//! chapter ([`SeriesSource::chapter_pages`]). The shipped reference
//! implementation is [`ManifestSource`], which reads JSON manifests over
//! HTTP and keeps the pipeline runnable end to end without any scraping.
//!
//! # Object Safety
//!
//! The trait uses `async_trait` to support dynamic dispatch via
//! `Arc<dyn SeriesSource>`. Rust 2024 native async traits are not
//! object-safe, so `async_trait` is required here.

mod manifest;

pub use manifest::ManifestSource;

use async_trait::async_trait;
use thiserror::Error;

/// One chapter of one series, as reported by the metadata fetch.
///
/// The position of a descriptor in [`SeriesInfo::chapters`] defines the
/// canonical chapter ordering as published upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterDescriptor {
    /// Location of the chapter (used later for page discovery and retries).
    pub url: String,
    /// Chapter title as published, unsanitized.
    pub title: String,
}

/// Series metadata: the display title plus the ordered chapter list.
#[derive(Debug, Clone)]
pub struct SeriesInfo {
    /// Series title as published, unsanitized.
    pub title: String,
    /// Chapters in published order.
    pub chapters: Vec<ChapterDescriptor>,
}

/// Errors surfaced by a [`SeriesSource`].
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS resolution, connection refused, TLS, etc.)
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// HTTP error response (4xx client errors, 5xx server errors).
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The response body could not be interpreted.
    #[error("unparseable response from {url}: {message}")]
    Parse {
        /// The URL whose response failed to parse.
        url: String,
        /// Description of the parse failure.
        message: String,
    },

    /// The series identifier is not something this source understands.
    #[error("invalid series identifier: {identifier}")]
    InvalidIdentifier {
        /// The rejected identifier.
        identifier: String,
    },
}

impl FetchError {
    /// Creates a network error from a reqwest error, folding timeouts into
    /// [`FetchError::Timeout`].
    pub fn from_request(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url }
        } else {
            Self::Network { url, source }
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a parse error.
    pub fn parse(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid-identifier error.
    pub fn invalid_identifier(identifier: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            identifier: identifier.into(),
        }
    }
}

/// Remote-site collaborator consumed by the pipeline core.
#[async_trait]
pub trait SeriesSource: Send + Sync {
    /// Fetches the series title and ordered chapter list for an identifier.
    async fn fetch_metadata(&self, identifier: &str) -> Result<SeriesInfo, FetchError>;

    /// Resolves one chapter into the ordered list of page image URLs.
    ///
    /// Called by the chapter downloader for fresh downloads and again
    /// during the retry pass (retries bypass [`Self::fetch_metadata`]
    /// because the chapter URL is already known).
    async fn chapter_pages(&self, chapter_url: &str) -> Result<Vec<String>, FetchError>;
}
