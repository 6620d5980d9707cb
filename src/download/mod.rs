//! Chapter download engine.
//!
//! [`PageClient`] streams a single page image to disk; [`ChapterDownloader`]
//! drives a semaphore-bounded pool of page fetches for one chapter and
//! reports success or failure for the chapter as a whole.

mod chapter;
mod client;
mod error;

pub use chapter::ChapterDownloader;
pub use client::PageClient;
pub use error::DownloadError;
