//! The individual conversion strategies.
//!
//! Each strategy takes the per-file [`Job`] and returns PDF bytes or the
//! fault that sends the converter on to the next strategy. Intermediate
//! files are always written through the job's scratch set.

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use tracing::warn;

use super::converter::Converter;
use super::resolver::{FormatClass, Strategy};
use crate::backend::docx::DocxDocument;
use crate::backend::raster;
use crate::backend::repair::repair_zip;
use crate::backend::sheet::{PRINT_SCALE, Sheet};
use crate::backend::{Margins, PrintOptions, RenderSource};
use crate::error::{Error, Result};
use crate::pdf::{
    TextStyle, decoded_image, error_page, image_document, jpeg_image, table_document,
    text_document,
};
use crate::scratch::ScratchSet;
use crate::templates::{self, DocumentPage, PageFooter, PageHeader, SheetPage, TextPage};
use crate::util::{base_name, safe_stem};

/// Body drawn for a document that parsed but holds no text.
const EMPTY_DOCUMENT_NOTICE: &str = "This document could not be converted properly.";
const VALID_DOCUMENT_HINT: &str = "Please check if the file is a valid Office document.";

/// Parse outcome shared by every strategy of one conversion.
type Cached<T> = Option<std::result::Result<Arc<T>, String>>;

/// State of one single-file conversion.
pub(super) struct Job {
    /// Original file name without directories
    pub file_name: String,
    /// Display title: the file name without extension
    pub title: String,
    /// Sanitised stem for the output file name
    pub stem: String,
    pub class: FormatClass,
    /// Normalised declared MIME type
    pub mime: String,
    pub bytes: Bytes,
    pub scratch: ScratchSet,
    /// Message of the most recent failed strategy
    pub last_error: Option<String>,
    document: Cached<DocxDocument>,
    sheet: Cached<Sheet>,
}

impl Job {
    pub fn new(
        original_filename: &str,
        class: FormatClass,
        mime: String,
        bytes: Bytes,
        scratch: ScratchSet,
    ) -> Self {
        let file_name = base_name(original_filename).to_string();
        let title = file_name
            .rsplit_once('.')
            .map_or(file_name.as_str(), |(stem, _)| stem)
            .to_string();
        Self {
            file_name,
            title,
            stem: safe_stem(original_filename),
            class,
            mime,
            bytes,
            scratch,
            last_error: None,
            document: None,
            sheet: None,
        }
    }

    /// Input decoded as UTF-8, invalid sequences replaced, BOM dropped.
    fn text(&self) -> String {
        let bytes = self.bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(&self.bytes[..]);
        String::from_utf8_lossy(bytes).into_owned()
    }
}

impl Converter {
    pub(super) async fn run_strategy(&self, strategy: Strategy, job: &mut Job) -> Result<Vec<u8>> {
        match strategy {
            Strategy::EmbedImage => {
                let bytes = job.bytes.clone();
                let jpeg = job.class == FormatClass::Jpeg;
                self.blocking(move || {
                    let image = if jpeg {
                        jpeg_image(&bytes)?
                    } else {
                        decoded_image(&bytes)?
                    };
                    image_document(&image)
                })
                .await
            }
            Strategy::TranscodeImage => {
                let bytes = job.bytes.clone();
                let mime = job.mime.clone();
                let png = self
                    .blocking(move || raster::transcode_to_png(&bytes, &mime))
                    .await?;
                self.embed_png(job, "transcoded.png", &png).await
            }
            Strategy::RasterizeSvg => {
                let bytes = job.bytes.clone();
                let dpi = self.svg_dpi;
                let png = self
                    .blocking(move || raster::rasterize_svg(&bytes, dpi))
                    .await?;
                self.embed_png(job, "rasterized.png", &png).await
            }
            Strategy::TextViaRenderer => {
                let text = job.text();
                let html = templates::render(&TextPage {
                    title: &job.file_name,
                    body: &text,
                    monospace: job.class == FormatClass::Csv,
                    show_title: false,
                })?;
                self.render_file(job, "text.html", &html, &PrintOptions::default())
                    .await
            }
            Strategy::TextDirect => {
                let text = job.text();
                self.blocking(move || text_document(None, &text, &TextStyle::plain()))
                    .await
            }
            Strategy::HtmlViaRenderer => {
                let html = job.text();
                self.renderer
                    .render(RenderSource::Html(&html), &PrintOptions::default())
                    .await
            }
            Strategy::DocumentViaRenderer => {
                let doc = self.document(job).await?;
                if doc.is_empty() {
                    return Err(Error::RenderFault("document has no text".to_string()));
                }
                let html = templates::render(&DocumentPage {
                    title: &job.title,
                    blocks: &doc.blocks,
                })?;
                let options = PrintOptions {
                    header_template: Some(templates::render(&PageHeader {
                        label: &job.file_name,
                    })?),
                    footer_template: Some(templates::render(&PageFooter { with_total: true })?),
                    ..Default::default()
                };
                self.render_file(job, "document.html", &html, &options).await
            }
            Strategy::DocumentTextViaRenderer => {
                let text = self.document(job).await?.to_text();
                if text.trim().is_empty() {
                    return Err(Error::RenderFault("document has no text".to_string()));
                }
                let html = templates::render(&TextPage {
                    title: &job.title,
                    body: &text,
                    monospace: false,
                    show_title: true,
                })?;
                self.render_file(job, "document-text.html", &html, &PrintOptions::default())
                    .await
            }
            Strategy::DocumentTextDirect => {
                let doc = self.document(job).await?;
                let title = job.title.clone();
                let file_name = job.file_name.clone();
                self.blocking(move || {
                    let body = if doc.is_empty() {
                        format!("{EMPTY_DOCUMENT_NOTICE}\nFilename: {file_name}\n{VALID_DOCUMENT_HINT}")
                    } else {
                        doc.to_text()
                    };
                    text_document(Some(&title), &body, &TextStyle::document())
                })
                .await
            }
            Strategy::DocumentErrorPage => {
                let message = job
                    .last_error
                    .clone()
                    .unwrap_or_else(|| "unknown error".to_string());
                let file_name = job.file_name.clone();
                self.blocking(move || error_page(&file_name, &message)).await
            }
            Strategy::SheetViaRenderer => {
                let sheet = self.sheet(job).await?;
                let html = templates::render(&SheetPage {
                    title: &sheet.name,
                    header: sheet.header(),
                    rows: sheet.body(),
                })?;
                let options = PrintOptions {
                    landscape: sheet.is_wide(),
                    margins: Margins::uniform(10.0),
                    scale: PRINT_SCALE,
                    footer_template: Some(templates::render(&PageFooter { with_total: false })?),
                    ..Default::default()
                };
                self.render_file(job, "sheet.html", &html, &options).await
            }
            Strategy::SheetTableDirect => {
                let sheet = self.sheet(job).await?;
                self.blocking(move || table_document(&sheet.name, &sheet.rows, sheet.is_wide()))
                    .await
            }
        }
    }

    /// Write markup to the scratch set and print it from there.
    async fn render_file(
        &self,
        job: &mut Job,
        name: &str,
        html: &str,
        options: &PrintOptions,
    ) -> Result<Vec<u8>> {
        let path = job.scratch.write(name, html.as_bytes()).await?;
        self.renderer.render(RenderSource::File(&path), options).await
    }

    /// Keep a canonical bitmap on disk, then embed it as a single page.
    async fn embed_png(&self, job: &mut Job, name: &str, png: &[u8]) -> Result<Vec<u8>> {
        let path = job.scratch.write(name, png).await?;
        self.blocking(move || {
            let bytes = std::fs::read(&path)?;
            image_document(&decoded_image(&bytes)?)
        })
        .await
    }

    /// Parsed word-processing document, parsed (and repaired) at most once.
    async fn document(&self, job: &mut Job) -> Result<Arc<DocxDocument>> {
        let cached = match job.document.take() {
            Some(cached) => cached,
            None => self
                .parse_container(job, "repaired.docx", DocxDocument::parse)
                .await
                .map(Arc::new)
                .map_err(container_reason),
        };
        job.document = Some(cached.clone());
        cached.map_err(Error::MalformedContainer)
    }

    /// First worksheet, read (and repaired) at most once.
    async fn sheet(&self, job: &mut Job) -> Result<Arc<Sheet>> {
        let cached = match job.sheet.take() {
            Some(cached) => cached,
            None => self
                .parse_container(job, "repaired.xlsx", Sheet::read_first)
                .await
                .map(Arc::new)
                .map_err(container_reason),
        };
        job.sheet = Some(cached.clone());
        cached.map_err(Error::MalformedContainer)
    }

    /// Parse the input; if the container is malformed, repair it into the
    /// scratch set and parse the repaired copy once.
    async fn parse_container<T, F>(&self, job: &mut Job, repaired_name: &str, parse: F) -> Result<T>
    where
        F: Fn(&[u8]) -> Result<T> + Copy + Send + 'static,
        T: Send + 'static,
    {
        let bytes = job.bytes.clone();
        let reason = match self.blocking(move || parse(&bytes)).await {
            Err(Error::MalformedContainer(reason)) => reason,
            other => return other,
        };

        warn!("'{}' is malformed ({}), attempting repair", job.file_name, reason);
        let bytes = job.bytes.clone();
        let repaired = self.blocking(move || repair_zip(&bytes)).await?;
        let path: PathBuf = job.scratch.write(repaired_name, &repaired).await?;
        self.blocking(move || {
            let bytes = std::fs::read(&path)?;
            parse(&bytes)
        })
        .await
    }
}

/// Reason text of a container fault, without the variant prefix.
fn container_reason(e: Error) -> String {
    match e {
        Error::MalformedContainer(reason) => reason,
        other => other.to_string(),
    }
}
