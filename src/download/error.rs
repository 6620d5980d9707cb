//! Error types for the download module.

use std::path::PathBuf;

use thiserror::Error;

use crate::source::FetchError;

/// Errors that can occur while downloading a chapter.
///
/// Any variant reported from [`ChapterDownloader::download`] means the
/// chapter as a whole failed and should be recorded for retry.
///
/// [`ChapterDownloader::download`]: super::ChapterDownloader::download
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Network-level error (DNS resolution, connection refused, TLS, etc.)
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// HTTP error response (4xx client errors, 5xx server errors).
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// File system error during download (create dir, write, etc.)
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The provided URL is malformed or invalid.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// Page discovery for the chapter failed.
    #[error("failed to list pages for {chapter_url}: {source}")]
    Pages {
        /// The chapter whose page list could not be fetched.
        chapter_url: String,
        /// The underlying fetch error.
        #[source]
        source: FetchError,
    },

    /// The chapter reported zero pages.
    #[error("no pages found for {chapter_url}")]
    NoPages {
        /// The chapter with an empty page list.
        chapter_url: String,
    },

    /// A page download task ended without producing a result.
    #[error("page task failed unexpectedly for {url}")]
    TaskFailed {
        /// The page URL whose task was lost.
        url: String,
    },

    /// The download pool was closed while work remained.
    #[error("download pool closed unexpectedly")]
    PoolClosed,
}

impl DownloadError {
    /// Creates a network error from a reqwest error, folding timeouts into
    /// [`DownloadError::Timeout`].
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

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a page-discovery error.
    pub fn pages(chapter_url: impl Into<String>, source: FetchError) -> Self {
        Self::Pages {
            chapter_url: chapter_url.into(),
            source,
        }
    }

    /// Creates an empty-chapter error.
    pub fn no_pages(chapter_url: impl Into<String>) -> Self {
        Self::NoPages {
            chapter_url: chapter_url.into(),
        }
    }
}
