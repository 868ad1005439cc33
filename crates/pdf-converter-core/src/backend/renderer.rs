use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::RendererConfig;
use crate::error::{Error, Result};

use super::chrome::ChromeRenderer;

/// A self-contained markup document to print.
#[derive(Debug, Clone, Copy)]
pub enum RenderSource<'a> {
    /// Markup passed inline
    Html(&'a str),
    /// Markup already written to disk (local file)
    File(&'a Path),
}

/// Page margins in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Margins {
    pub const fn uniform(mm: f64) -> Self {
        Self {
            top: mm,
            right: mm,
            bottom: mm,
            left: mm,
        }
    }
}

/// Print settings for one document. Paper is always A4.
///
/// Header and footer templates are HTML fragments; elements with the classes
/// `pageNumber`, `totalPages`, `title` and `date` are filled in per page.
#[derive(Debug, Clone, PartialEq)]
pub struct PrintOptions {
    pub landscape: bool,
    pub print_background: bool,
    pub margins: Margins,
    pub scale: f64,
    pub header_template: Option<String>,
    pub footer_template: Option<String>,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            landscape: false,
            print_background: true,
            margins: Margins::uniform(20.0),
            scale: 1.0,
            header_template: None,
            footer_template: None,
        }
    }
}

impl PrintOptions {
    pub fn has_header_footer(&self) -> bool {
        self.header_template.is_some() || self.footer_template.is_some()
    }
}

/// Information about a renderer backend
#[derive(Debug, Clone)]
pub struct RendererInfo {
    /// Human-readable name
    pub name: &'static str,
    /// Whether the backend keeps a long-lived engine process
    pub shared_engine: bool,
}

/// Trait for HTML-to-PDF backends
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    /// Get information about this renderer
    fn info(&self) -> RendererInfo;

    /// Get the renderer name (convenience method)
    fn name(&self) -> &'static str {
        self.info().name
    }

    /// Print a markup document to PDF bytes.
    ///
    /// Must fail with [`Error::BackendUnavailable`] when the engine cannot
    /// be started, so callers fall back to strategies without a renderer.
    async fn render(&self, source: RenderSource<'_>, options: &PrintOptions) -> Result<Vec<u8>>;

    /// Check if the renderer can be used at all
    fn is_available(&self) -> bool {
        true
    }
}

/// Renderer used when HTML rendering is switched off.
pub struct DisabledRenderer;

#[async_trait]
impl DocumentRenderer for DisabledRenderer {
    fn info(&self) -> RendererInfo {
        RendererInfo {
            name: "disabled",
            shared_engine: false,
        }
    }

    async fn render(&self, _source: RenderSource<'_>, _options: &PrintOptions) -> Result<Vec<u8>> {
        Err(Error::BackendUnavailable(
            "HTML rendering is disabled".to_string(),
        ))
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// Create a renderer from configuration
///
/// Nothing is launched here; the Chrome engine starts on first use.
pub fn create_renderer(config: &RendererConfig) -> Arc<dyn DocumentRenderer> {
    if config.enabled {
        Arc::new(ChromeRenderer::new(config.clone()))
    } else {
        Arc::new(DisabledRenderer)
    }
}
