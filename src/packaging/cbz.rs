//! CBZ archiver: zips a chapter's page images into `<chapter>.cbz`.
//!
//! The archive is written to a temp file and renamed into place next to the
//! chapter directory, so a crash mid-write never leaves a half-built `.cbz`
//! that looks finished. Images are deleted only after the rename succeeds.
//! Entries are stored uncompressed (page images are already compressed) in
//! sorted filename order, which matches the zero-padded page ordinals.

use std::fs::File;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};
use zip::CompressionMethod;
use zip::write::{FileOptions, ZipWriter};

use super::{PackageError, Packager, PackagingTask};

/// [`Packager`] producing CBZ archives.
#[derive(Debug, Default, Clone, Copy)]
pub struct CbzPackager;

impl CbzPackager {
    /// Creates a CBZ packager.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Packager for CbzPackager {
    async fn package(
        &self,
        task: &PackagingTask,
        delete_images: bool,
    ) -> Result<(), PackageError> {
        let chapter_dir = task.chapter_dir.clone();
        let archive_path = archive_path_for(&chapter_dir);
        let join_path = archive_path.clone();

        // Zip writing is synchronous; keep it off the async worker thread.
        let result = tokio::task::spawn_blocking(move || {
            write_archive(&chapter_dir, &archive_path, delete_images)
        })
        .await;

        match result {
            Ok(outcome) => outcome,
            Err(source) => Err(PackageError::Background {
                path: join_path,
                source,
            }),
        }
    }
}

/// Resolves the archive path: a `.cbz` sibling of the chapter directory.
fn archive_path_for(chapter_dir: &Path) -> PathBuf {
    let file_name = chapter_dir
        .file_name()
        .map_or_else(|| "chapter".to_string(), |n| n.to_string_lossy().into_owned());
    let parent = chapter_dir
        .parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    parent.join(format!("{file_name}.cbz"))
}

fn write_archive(
    chapter_dir: &Path,
    archive_path: &Path,
    delete_images: bool,
) -> Result<(), PackageError> {
    let io_error = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| PackageError::Io {
            path: path.clone(),
            source,
        }
    };

    let mut entries: Vec<PathBuf> = std::fs::read_dir(chapter_dir)
        .map_err(io_error(chapter_dir))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    entries.sort();

    if entries.is_empty() {
        return Err(PackageError::Empty {
            path: chapter_dir.to_path_buf(),
        });
    }

    let tmp_path = archive_path.with_extension("cbz.tmp");
    let file = File::create(&tmp_path).map_err(io_error(&tmp_path))?;
    let mut writer = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Stored);

    for entry in &entries {
        let Some(name) = entry.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        writer
            .start_file(name.as_str(), options)
            .map_err(|source| PackageError::Archive {
                path: tmp_path.clone(),
                source,
            })?;
        let mut reader = File::open(entry).map_err(io_error(entry))?;
        std::io::copy(&mut reader, &mut writer).map_err(io_error(entry))?;
    }

    writer.finish().map_err(|source| PackageError::Archive {
        path: tmp_path.clone(),
        source,
    })?;
    std::fs::rename(&tmp_path, archive_path).map_err(io_error(archive_path))?;

    debug!(
        archive = %archive_path.display(),
        pages = entries.len(),
        "archive written"
    );

    if delete_images {
        // The archive is durable at this point; failing to reclaim the
        // images is not a packaging failure.
        if let Err(e) = std::fs::remove_dir_all(chapter_dir) {
            warn!(
                dir = %chapter_dir.display(),
                error = %e,
                "failed to remove chapter images after packaging"
            );
        }
    }

    Ok(())
}
