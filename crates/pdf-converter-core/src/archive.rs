//! Zip packaging of the PDFs produced by one batch.
//!
//! The archive is written on the blocking pool, entries are deflated at the
//! highest level, and the file is synced to disk before the path is
//! returned. A partially written archive is removed on failure.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

use crate::error::{Error, Result};
use crate::util::create_unique;

const COMPRESSION_LEVEL: i64 = 9;

/// One file to package and the name it gets inside the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub path: PathBuf,
    pub name: String,
}

impl ArchiveEntry {
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
        }
    }
}

/// Write `<prefix>_<millis>.zip` into `output_dir` holding every entry.
pub async fn assemble(entries: &[ArchiveEntry], output_dir: &Path, prefix: &str) -> Result<PathBuf> {
    let entries = entries.to_vec();
    let output_dir = output_dir.to_path_buf();
    let prefix = prefix.to_string();

    let path = tokio::task::spawn_blocking(move || write_archive(&entries, &output_dir, &prefix))
        .await
        .map_err(io::Error::other)??;
    info!("Created archive {}", path.display());
    Ok(path)
}

fn write_archive(entries: &[ArchiveEntry], output_dir: &Path, prefix: &str) -> Result<PathBuf> {
    let (path, file) = create_unique(output_dir, prefix, '_', "zip")?;
    match fill(file, entries) {
        Ok(()) => Ok(path),
        Err(e) => {
            if let Err(rm) = std::fs::remove_file(&path) {
                warn!("Failed to remove partial archive {}: {}", path.display(), rm);
            }
            Err(e)
        }
    }
}

fn fill(file: File, entries: &[ArchiveEntry]) -> Result<()> {
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(COMPRESSION_LEVEL));

    for entry in entries {
        zip.start_file(entry.name.as_str(), options)
            .map_err(zip_error)?;
        let mut source = File::open(&entry.path).map_err(|e| {
            Error::Io(io::Error::new(
                e.kind(),
                format!("{}: {e}", entry.path.display()),
            ))
        })?;
        io::copy(&mut source, &mut zip)?;
    }

    let writer = zip.finish().map_err(zip_error)?;
    let file = writer.into_inner().map_err(io::IntoInnerError::into_error)?;
    file.sync_all()?;
    Ok(())
}

fn zip_error(e: zip::result::ZipError) -> Error {
    Error::Io(io::Error::other(e))
}
