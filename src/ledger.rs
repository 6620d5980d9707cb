//! Durable record of chapters that failed to download.
//!
//! The ledger is the only cross-run state in the pipeline: a JSON array of
//! [`FailureRecord`] entries, written atomically (temp file + rename) after
//! every change so a crash mid-batch loses no failure information. Absence
//! of the file is the steady-state "no known failures" signal; saving an
//! empty ledger therefore removes the file rather than leaving an empty
//! one behind. A missing or unparseable file loads as "no known failures"
//! and is never fatal.
//!
//! Writers serialize through an internal async mutex, so concurrent series
//! workers can append records without losing updates.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Everything needed to retry one failed chapter without re-fetching
/// series metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Series title as published (unsanitized).
    pub series_title: String,
    /// Numbered display title of the chapter (prefix + sanitized title).
    pub chapter_title: String,
    /// Chapter URL, sufficient for direct re-download.
    pub chapter_url: String,
}

/// Errors from ledger persistence.
///
/// Loading is infallible by contract; only writes can fail, and callers
/// treat a failed write as a logged warning rather than a pipeline error.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// File system error reading or writing the ledger.
    #[error("IO error on ledger {path}: {source}")]
    Io {
        /// The ledger path involved.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The record list could not be serialized.
    #[error("failed to serialize ledger: {source}")]
    Serialize {
        /// The underlying serde error.
        #[source]
        source: serde_json::Error,
    },
}

/// Persistent failure ledger with serialized writers.
#[derive(Debug)]
pub struct FailureLedger {
    path: PathBuf,
    records: Mutex<Vec<FailureRecord>>,
}

impl FailureLedger {
    /// Creates a ledger handle for `path` without touching the disk.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: Mutex::new(Vec::new()),
        }
    }

    /// Returns the on-disk location of the ledger.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads persisted records, replacing the in-memory state.
    ///
    /// A missing file yields an empty list. An unreadable or unparseable
    /// file is logged and also yields an empty list; corruption is treated
    /// as "no known failures," never as a fatal condition.
    pub async fn load(&self) -> Vec<FailureRecord> {
        let loaded = match tokio::fs::read(&self.path).await {
            Ok(bytes) => match serde_json::from_slice::<Vec<FailureRecord>>(&bytes) {
                Ok(records) => records,
                Err(e) => {
                    warn!(
                        path = %self.path.display(),
                        error = %e,
                        "failure ledger is unparseable; treating as empty"
                    );
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "failure ledger is unreadable; treating as empty"
                );
                Vec::new()
            }
        };

        let mut records = self.records.lock().await;
        records.clone_from(&loaded);
        loaded
    }

    /// Appends one record and persists the ledger immediately.
    ///
    /// A record identical to one already present is not duplicated, so
    /// re-failing a carried-over chapter keeps the ledger a set.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the updated ledger cannot be written.
    pub async fn record(&self, record: FailureRecord) -> Result<(), LedgerError> {
        let mut records = self.records.lock().await;
        if !records.contains(&record) {
            records.push(record);
        }
        persist(&self.path, &records).await
    }

    /// Atomically replaces the persisted state with `new_records`.
    ///
    /// Saving an empty list removes the file entirely.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if serialization or the write fails.
    pub async fn save(&self, new_records: Vec<FailureRecord>) -> Result<(), LedgerError> {
        let mut records = self.records.lock().await;
        *records = new_records;
        persist(&self.path, &records).await
    }

    /// Returns a copy of the current in-memory records.
    pub async fn snapshot(&self) -> Vec<FailureRecord> {
        self.records.lock().await.clone()
    }
}

/// Writes the record list atomically, or removes the file when empty.
async fn persist(path: &Path, records: &[FailureRecord]) -> Result<(), LedgerError> {
    if records.is_empty() {
        match tokio::fs::remove_file(path).await {
            Ok(()) => debug!(path = %path.display(), "failure ledger cleared"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(LedgerError::Io {
                path: path.to_path_buf(),
                source: e,
            }),
        }
        return Ok(());
    }

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| LedgerError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
    }

    let json =
        serde_json::to_vec_pretty(records).map_err(|source| LedgerError::Serialize { source })?;

    // Write to a sibling temp file, then rename into place
    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, &json)
        .await
        .map_err(|e| LedgerError::Io {
            path: tmp_path.clone(),
            source: e,
        })?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| LedgerError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

    debug!(path = %path.display(), count = records.len(), "failure ledger persisted");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(n: u32) -> FailureRecord {
        FailureRecord {
            series_title: "Series".to_string(),
            chapter_title: format!("{n:02}_Chapter_{n}"),
            chapter_url: format!("https://example.com/c/{n}"),
        }
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let ledger = FailureLedger::new(dir.path().join("failed_chapters.json"));
        assert!(ledger.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_record_then_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("failed_chapters.json");

        let ledger = FailureLedger::new(&path);
        ledger.record(record(1)).await.unwrap();
        ledger.record(record(2)).await.unwrap();
        assert!(path.exists(), "ledger file should exist after record()");

        // A fresh handle sees the persisted state
        let reloaded = FailureLedger::new(&path).load().await;
        assert_eq!(reloaded, vec![record(1), record(2)]);
    }

    #[tokio::test]
    async fn test_record_deduplicates_identical_records() {
        let dir = TempDir::new().unwrap();
        let ledger = FailureLedger::new(dir.path().join("failed_chapters.json"));
        ledger.record(record(1)).await.unwrap();
        ledger.record(record(1)).await.unwrap();
        assert_eq!(ledger.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_file_loads_as_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("failed_chapters.json");
        tokio::fs::write(&path, b"{ not json").await.unwrap();

        let ledger = FailureLedger::new(&path);
        assert!(ledger.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_save_empty_removes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("failed_chapters.json");

        let ledger = FailureLedger::new(&path);
        ledger.record(record(1)).await.unwrap();
        assert!(path.exists());

        ledger.save(Vec::new()).await.unwrap();
        assert!(!path.exists(), "empty save must remove the ledger file");
    }

    #[tokio::test]
    async fn test_save_empty_without_file_is_ok() {
        let dir = TempDir::new().unwrap();
        let ledger = FailureLedger::new(dir.path().join("failed_chapters.json"));
        ledger.save(Vec::new()).await.unwrap();
    }

    #[tokio::test]
    async fn test_save_replaces_previous_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("failed_chapters.json");

        let ledger = FailureLedger::new(&path);
        ledger.record(record(1)).await.unwrap();
        ledger.record(record(2)).await.unwrap();
        ledger.save(vec![record(2)]).await.unwrap();

        let reloaded = FailureLedger::new(&path).load().await;
        assert_eq!(reloaded, vec![record(2)]);
    }

    #[tokio::test]
    async fn test_persist_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/output/failed_chapters.json");

        let ledger = FailureLedger::new(&path);
        ledger.record(record(1)).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_persisted_field_names_are_stable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("failed_chapters.json");

        let ledger = FailureLedger::new(&path);
        ledger.record(record(7)).await.unwrap();

        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(raw.contains("\"series_title\""), "Got: {raw}");
        assert!(raw.contains("\"chapter_title\""), "Got: {raw}");
        assert!(raw.contains("\"chapter_url\""), "Got: {raw}");
    }
}
