//! PDF Converter Core Library
//!
//! This library converts batches of uploaded files into PDFs:
//! - Format resolution and ordered fallback strategies per file
//! - Rendering backends (headless Chrome, raster and SVG, DOCX, spreadsheets)
//! - Direct PDF drawing for renderer-free fallbacks
//! - Concurrent batch orchestration with zip packaging
//! - Scoped cleanup of every intermediate file

pub mod archive;
pub mod backend;
pub mod batch;
pub mod config;
pub mod convert;
pub mod error;
pub mod pdf;
pub mod scratch;
pub mod templates;
pub mod util;

pub use archive::ArchiveEntry;
pub use backend::{DocumentRenderer, PrintOptions, RenderSource, RendererInfo, create_renderer};
pub use batch::{
    BatchConverter, BatchManifest, BatchOutcome, ConversionResult, ConversionStatus,
    UploadSource, UploadedFile,
};
pub use config::{AppConfig, LimitViolation, UploadLimits};
pub use convert::{Converter, FormatClass, FormatResolver, Strategy};
pub use error::{Error, Result};
pub use scratch::ScratchSet;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.archive.prefix, "converted");
        assert!(config.renderer.enabled);
        assert_eq!(config.converter.svg_dpi, 300);
    }
}
