//! Askama templates for the markup handed to the HTML renderer.
//!
//! ## Template Structure
//!
//! - `base.html` - A4 page setup and base typography
//! - `text.html` - Plain text and CSV, whitespace preserved
//! - `document.html` - Extracted word-processing content (`run.html` per run)
//! - `sheet.html` - First worksheet as a table with a repeating header
//! - `page_header.html`, `page_footer.html` - Print header/footer fragments

use askama::Template;

use crate::backend::docx::Block;
use crate::error::{Error, Result};

// =============================================================================
// Full Page Templates
// =============================================================================

/// Text file laid out with preserved line breaks.
#[derive(Template)]
#[template(path = "text.html")]
pub struct TextPage<'a> {
    pub title: &'a str,
    pub body: &'a str,
    /// Fixed-width font, for CSV
    pub monospace: bool,
    /// Print the title above the text
    pub show_title: bool,
}

/// Word-processing document with headings, paragraphs and tables.
#[derive(Template)]
#[template(path = "document.html")]
pub struct DocumentPage<'a> {
    pub title: &'a str,
    pub blocks: &'a [Block],
}

/// Worksheet table; `<thead>` repeats on every printed page.
#[derive(Template)]
#[template(path = "sheet.html")]
pub struct SheetPage<'a> {
    pub title: &'a str,
    pub header: &'a [String],
    pub rows: &'a [Vec<String>],
}

// =============================================================================
// Print Fragments
// =============================================================================

#[derive(Template)]
#[template(path = "page_header.html")]
pub struct PageHeader<'a> {
    pub label: &'a str,
}

/// Page number footer, optionally with the total page count.
#[derive(Template)]
#[template(path = "page_footer.html")]
pub struct PageFooter {
    pub with_total: bool,
}

/// Render any template, mapping failures to a render fault.
pub fn render<T: Template>(template: &T) -> Result<String> {
    template
        .render()
        .map_err(|e| Error::RenderFault(format!("template rendering failed: {e}")))
}
