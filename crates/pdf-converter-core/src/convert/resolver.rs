//! Declared content type → ordered conversion strategies.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Broad input category a MIME type belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatClass {
    Jpeg,
    Png,
    /// GIF, BMP, TIFF, WebP
    Raster,
    Svg,
    Text,
    Csv,
    Html,
    /// Word-processing document (DOCX)
    Document,
    /// XLSX, XLS, ODS
    Spreadsheet,
}

impl FormatClass {
    /// Strategies to attempt, most capable first.
    pub const fn strategies(self) -> &'static [Strategy] {
        match self {
            Self::Jpeg | Self::Png => &[Strategy::EmbedImage],
            Self::Raster => &[Strategy::TranscodeImage],
            Self::Svg => &[Strategy::RasterizeSvg],
            Self::Text | Self::Csv => &[Strategy::TextViaRenderer, Strategy::TextDirect],
            Self::Html => &[Strategy::HtmlViaRenderer],
            Self::Document => &[
                Strategy::DocumentViaRenderer,
                Strategy::DocumentTextViaRenderer,
                Strategy::DocumentTextDirect,
                Strategy::DocumentErrorPage,
            ],
            Self::Spreadsheet => &[Strategy::SheetViaRenderer, Strategy::SheetTableDirect],
        }
    }
}

/// A named procedure turning one file into PDF bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// JPEG passthrough or lossless PNG embedding
    EmbedImage,
    /// Decode any raster format, re-encode as PNG, embed
    TranscodeImage,
    /// Rasterize vector input at the configured density, embed
    RasterizeSvg,
    /// Text in an HTML template, printed by the renderer
    TextViaRenderer,
    /// Text drawn with a standard font
    TextDirect,
    /// Input markup printed as-is
    HtmlViaRenderer,
    /// Extracted headings and paragraphs, printed by the renderer
    DocumentViaRenderer,
    /// Extracted raw text, printed by the renderer
    DocumentTextViaRenderer,
    /// Extracted raw text drawn with a standard font
    DocumentTextDirect,
    /// Explanatory page; the file is still reported as failed
    DocumentErrorPage,
    /// First sheet as an HTML table, printed by the renderer
    SheetViaRenderer,
    /// First sheet drawn as a shaded table
    SheetTableDirect,
}

impl Strategy {
    pub const fn name(self) -> &'static str {
        match self {
            Self::EmbedImage => "embed-image",
            Self::TranscodeImage => "transcode-image",
            Self::RasterizeSvg => "rasterize-svg",
            Self::TextViaRenderer => "text-renderer",
            Self::TextDirect => "text-direct",
            Self::HtmlViaRenderer => "html-renderer",
            Self::DocumentViaRenderer => "document-renderer",
            Self::DocumentTextViaRenderer => "document-text-renderer",
            Self::DocumentTextDirect => "document-text-direct",
            Self::DocumentErrorPage => "document-error-page",
            Self::SheetViaRenderer => "sheet-renderer",
            Self::SheetTableDirect => "sheet-table-direct",
        }
    }

    /// Whether the strategy depends on the shared HTML renderer.
    pub const fn uses_renderer(self) -> bool {
        matches!(
            self,
            Self::TextViaRenderer
                | Self::HtmlViaRenderer
                | Self::DocumentViaRenderer
                | Self::DocumentTextViaRenderer
                | Self::SheetViaRenderer
        )
    }

    /// Whether a PDF from this strategy still counts as a failed conversion.
    pub const fn is_soft_failure(self) -> bool {
        matches!(self, Self::DocumentErrorPage)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lower-case a MIME type and drop any parameters (`; charset=...`).
pub fn normalize_mime(mime: &str) -> String {
    mime.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

const DEFAULT_TABLE: &[(&str, FormatClass)] = &[
    ("image/jpeg", FormatClass::Jpeg),
    ("image/jpg", FormatClass::Jpeg),
    ("image/pjpeg", FormatClass::Jpeg),
    ("image/png", FormatClass::Png),
    ("image/gif", FormatClass::Raster),
    ("image/bmp", FormatClass::Raster),
    ("image/x-ms-bmp", FormatClass::Raster),
    ("image/tiff", FormatClass::Raster),
    ("image/webp", FormatClass::Raster),
    ("image/svg+xml", FormatClass::Svg),
    ("text/plain", FormatClass::Text),
    ("text/csv", FormatClass::Csv),
    ("application/csv", FormatClass::Csv),
    ("text/html", FormatClass::Html),
    ("application/xhtml+xml", FormatClass::Html),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        FormatClass::Document,
    ),
    (
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        FormatClass::Spreadsheet,
    ),
    ("application/vnd.ms-excel", FormatClass::Spreadsheet),
    (
        "application/vnd.oasis.opendocument.spreadsheet",
        FormatClass::Spreadsheet,
    ),
];

/// Maps declared MIME types to format classes and their strategy chains.
#[derive(Debug, Clone)]
pub struct FormatResolver {
    table: HashMap<String, FormatClass>,
}

impl Default for FormatResolver {
    fn default() -> Self {
        Self {
            table: DEFAULT_TABLE
                .iter()
                .map(|(mime, class)| ((*mime).to_string(), *class))
                .collect(),
        }
    }
}

impl FormatResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map an additional MIME type onto an existing class.
    #[must_use]
    pub fn with_alias(mut self, mime: &str, class: FormatClass) -> Self {
        self.table.insert(normalize_mime(mime), class);
        self
    }

    /// Extend the table with every entry of `aliases`.
    #[must_use]
    pub fn with_aliases<'a>(
        self,
        aliases: impl IntoIterator<Item = (&'a String, &'a FormatClass)>,
    ) -> Self {
        aliases
            .into_iter()
            .fold(self, |resolver, (mime, class)| resolver.with_alias(mime, *class))
    }

    pub fn class_of(&self, mime: &str) -> Option<FormatClass> {
        self.table.get(&normalize_mime(mime)).copied()
    }

    /// Ordered strategies for `mime`; empty when the type is unsupported.
    pub fn resolve(&self, mime: &str) -> &'static [Strategy] {
        match self.class_of(mime) {
            Some(class) => class.strategies(),
            None => &[],
        }
    }
}
