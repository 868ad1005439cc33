use std::path::PathBuf;

use thiserror::Error;

use crate::batch::ConversionResult;

/// Unified error type for pdf-converter-core
///
/// Two shapes of failure flow through this enum:
/// - Per-file conversion faults, which the single-file converter turns into
///   an `error` entry of the batch manifest and never propagates further
/// - Batch-level faults (empty batch, unusable directories, archive
///   packaging), which are returned to the caller of `convert_batch`
#[derive(Error, Debug)]
pub enum Error {
    // ==========================================================================
    // Per-file Conversion Faults
    // ==========================================================================
    /// The declared content type has no conversion strategy
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    /// The shared HTML renderer could not be started or reached
    #[error("rendering backend unavailable: {0}")]
    BackendUnavailable(String),

    /// An office container is not a well-formed archive, even after repair
    #[error("malformed document container: {0}")]
    MalformedContainer(String),

    /// A strategy ran but produced no usable output
    #[error("render failed: {0}")]
    RenderFault(String),

    /// A bounded step exceeded its time ceiling
    #[error("{what} timed out after {secs}s")]
    Timeout { what: &'static str, secs: u64 },

    /// Failed to decode or encode a raster image
    #[error("image processing failed: {0}")]
    Image(String),

    /// Error from the lopdf library
    #[error("lopdf error: {0}")]
    Lopdf(String),

    /// Failed to save a PDF
    #[error("failed to save PDF: {0}")]
    PdfSave(String),

    // ==========================================================================
    // Batch Errors
    // ==========================================================================
    /// A batch with no files was submitted
    #[error("No files were submitted")]
    EmptyBatch,

    /// The output or scratch directory is not usable
    #[error("directory {} is not usable: {reason}", path.display())]
    Setup { path: PathBuf, reason: String },

    /// Every file settled but the archive could not be written
    #[error("Files were converted but the archive could not be created: {reason}")]
    Packaging {
        reason: String,
        results: Vec<ConversionResult>,
    },

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Failed to load configuration file
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    /// Invalid configuration value
    #[error("invalid config value for '{field}': {reason}")]
    ConfigInvalid { field: String, reason: String },

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error aborts a whole batch rather than a single file.
    pub const fn is_batch_level(&self) -> bool {
        matches!(
            self,
            Self::EmptyBatch | Self::Setup { .. } | Self::Packaging { .. }
        )
    }
}

impl From<lopdf::Error> for Error {
    fn from(e: lopdf::Error) -> Self {
        Self::Lopdf(e.to_string())
    }
}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Self::Image(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_type_names_mime() {
        let err = Error::UnsupportedType("application/zip".to_string());
        assert_eq!(err.to_string(), "Unsupported file type: application/zip");
        assert!(!err.is_batch_level());
    }

    #[test]
    fn test_batch_level_classification() {
        assert!(Error::EmptyBatch.is_batch_level());
        assert!(
            Error::Packaging {
                reason: "disk full".to_string(),
                results: Vec::new(),
            }
            .is_batch_level()
        );
        assert!(!Error::RenderFault("empty".to_string()).is_batch_level());
    }
}
