//! Batch orchestration: concurrent per-file conversion, manifest, archive.
//!
//! Every file of a batch is converted on its own task. The batch waits for
//! all of them, whatever their outcome, deletes the uploaded bytes, and
//! packages the generated PDFs into one archive when at least one file
//! converted successfully.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::archive::{self, ArchiveEntry};
use crate::config::AppConfig;
use crate::convert::Converter;
use crate::error::{Error, Result};
use crate::util::file_name;

/// Archive prefix used when none is configured.
pub const DEFAULT_ARCHIVE_PREFIX: &str = "converted";

// =============================================================================
// Uploaded Files
// =============================================================================

/// Where the bytes of an upload live.
#[derive(Debug, Clone)]
pub enum UploadSource {
    /// Stored by the upload layer; deleted once converted
    Path(PathBuf),
    /// Held in memory; nothing to delete
    Memory(Bytes),
}

/// One accepted input file.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_filename: String,
    /// Declared MIME type, as sent by the client
    pub mime: String,
    pub size: u64,
    pub source: UploadSource,
}

impl UploadedFile {
    /// An upload already written to disk.
    pub fn stored(
        original_filename: impl Into<String>,
        mime: impl Into<String>,
        path: impl Into<PathBuf>,
        size: u64,
    ) -> Self {
        Self {
            original_filename: original_filename.into(),
            mime: mime.into(),
            size,
            source: UploadSource::Path(path.into()),
        }
    }

    /// An upload held in memory.
    pub fn in_memory(
        original_filename: impl Into<String>,
        mime: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        let bytes = bytes.into();
        Self {
            original_filename: original_filename.into(),
            mime: mime.into(),
            size: bytes.len() as u64,
            source: UploadSource::Memory(bytes),
        }
    }

    pub async fn read(&self) -> io::Result<Bytes> {
        match &self.source {
            UploadSource::Path(path) => tokio::fs::read(path).await.map(Bytes::from),
            UploadSource::Memory(bytes) => Ok(bytes.clone()),
        }
    }

    /// Delete the stored bytes. Missing files are ignored, other failures
    /// are logged.
    pub async fn discard(&self) {
        if let UploadSource::Path(path) = &self.source {
            match tokio::fs::remove_file(path).await {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to delete upload {}: {}", path.display(), e),
            }
        }
    }
}

// =============================================================================
// Results
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionStatus {
    Success,
    Error,
}

/// Outcome of converting one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    pub original_filename: String,
    pub status: ConversionStatus,
    /// Generated PDF in the output directory
    pub pdf_name: Option<String>,
    pub error: Option<String>,
}

impl ConversionResult {
    pub fn success(original_filename: impl Into<String>, pdf_name: impl Into<String>) -> Self {
        Self {
            original_filename: original_filename.into(),
            status: ConversionStatus::Success,
            pdf_name: Some(pdf_name.into()),
            error: None,
        }
    }

    pub fn failure(original_filename: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            original_filename: original_filename.into(),
            status: ConversionStatus::Error,
            pdf_name: None,
            error: Some(error.into()),
        }
    }

    /// Failed conversion that still produced an explanatory PDF.
    pub fn soft_failure(
        original_filename: impl Into<String>,
        pdf_name: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            pdf_name: Some(pdf_name.into()),
            ..Self::failure(original_filename, error)
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ConversionStatus::Success
    }
}

/// Overall classification of a settled batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Every file converted
    Complete,
    /// Some files converted, some failed
    Partial,
    /// Nothing converted
    Failed,
}

/// Aggregate report returned for one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchManifest {
    /// True iff no file failed
    pub success: bool,
    pub message: String,
    pub results: Vec<ConversionResult>,
    pub archive_name: Option<String>,
}

impl BatchManifest {
    pub fn new(results: Vec<ConversionResult>, archive_name: Option<String>) -> Self {
        let succeeded = results.iter().filter(|r| r.is_success()).count();
        let failed = results.len() - succeeded;
        let message = match (succeeded, failed) {
            (0, _) => "No files could be converted.".to_string(),
            (n, 0) => format!("{n} file(s) converted successfully."),
            (n, f) => format!("{n} file(s) converted, {f} failed."),
        };
        Self {
            success: failed == 0,
            message,
            results,
            archive_name,
        }
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    pub fn outcome(&self) -> BatchOutcome {
        match (self.succeeded(), self.failed()) {
            (0, _) => BatchOutcome::Failed,
            (_, 0) => BatchOutcome::Complete,
            _ => BatchOutcome::Partial,
        }
    }
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Converts whole batches into PDFs plus one archive.
pub struct BatchConverter {
    converter: Arc<Converter>,
    output_dir: PathBuf,
    scratch_dir: PathBuf,
    archive_prefix: String,
}

impl BatchConverter {
    pub fn new(
        converter: Arc<Converter>,
        output_dir: impl Into<PathBuf>,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            converter,
            output_dir: output_dir.into(),
            scratch_dir: scratch_dir.into(),
            archive_prefix: DEFAULT_ARCHIVE_PREFIX.to_string(),
        }
    }

    /// Build the converter, renderer and directories from configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            Arc::new(Converter::new(config)),
            &config.storage.output_dir,
            &config.storage.scratch_dir,
        )
        .with_archive_prefix(&config.archive.prefix)
    }

    #[must_use]
    pub fn with_archive_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.archive_prefix = prefix.into();
        self
    }

    pub const fn converter(&self) -> &Arc<Converter> {
        &self.converter
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Convert every file concurrently and package the results.
    ///
    /// Per-file faults end up in the manifest. Only an empty batch,
    /// unusable directories and a failed archive write are returned as
    /// errors.
    pub async fn convert_batch(&self, files: Vec<UploadedFile>) -> Result<BatchManifest> {
        if files.is_empty() {
            return Err(Error::EmptyBatch);
        }

        if let Err(e) = self.check_directories().await {
            for file in &files {
                file.discard().await;
            }
            return Err(e);
        }

        info!("Converting batch of {} file(s)", files.len());

        let tasks = files.into_iter().map(|file| {
            let converter = Arc::clone(&self.converter);
            let output_dir = self.output_dir.clone();
            let scratch_dir = self.scratch_dir.clone();
            async move {
                let upload = file.clone();
                let handle = tokio::spawn(async move {
                    converter
                        .convert_file(&upload, &output_dir, &scratch_dir)
                        .await
                });
                let result = match handle.await {
                    Ok(result) => result,
                    Err(e) => {
                        error!("Conversion of '{}' aborted: {}", file.original_filename, e);
                        ConversionResult::failure(
                            &file.original_filename,
                            format!("conversion aborted unexpectedly: {e}"),
                        )
                    }
                };
                file.discard().await;
                result
            }
        });
        let results = futures::future::join_all(tasks).await;

        let archive_name = if results.iter().any(ConversionResult::is_success) {
            let entries: Vec<ArchiveEntry> = results
                .iter()
                .filter_map(|r| r.pdf_name.as_deref())
                .map(|name| ArchiveEntry::new(self.output_dir.join(name), name))
                .collect();

            match archive::assemble(&entries, &self.output_dir, &self.archive_prefix).await {
                Ok(path) => Some(file_name(&path)),
                Err(e) => {
                    error!("Packaging failed: {}", e);
                    return Err(Error::Packaging {
                        reason: e.to_string(),
                        results,
                    });
                }
            }
        } else {
            None
        };

        let manifest = BatchManifest::new(results, archive_name);
        info!(
            "Batch finished: {} succeeded, {} failed",
            manifest.succeeded(),
            manifest.failed()
        );
        Ok(manifest)
    }

    /// Both directories must exist and accept new files.
    async fn check_directories(&self) -> Result<()> {
        for dir in [&self.output_dir, &self.scratch_dir] {
            let probe_dir = dir.clone();
            let probe = tokio::task::spawn_blocking(move || {
                tempfile::Builder::new()
                    .prefix(".probe-")
                    .tempfile_in(&probe_dir)
                    .map(drop)
            })
            .await
            .map_err(io::Error::other)
            .and_then(|r| r);

            if let Err(e) = probe {
                return Err(Error::Setup {
                    path: dir.clone(),
                    reason: e.to_string(),
                });
            }
        }
        Ok(())
    }
}
