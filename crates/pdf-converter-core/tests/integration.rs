//! Integration tests for pdf-converter-core
//!
//! These tests drive whole batches through the public API:
//! - Strategy fallback with failing and healthy fake renderers
//! - Per-file isolation and manifest completeness
//! - Archive contents and output naming
//! - Scratch and upload cleanup on every outcome

#![allow(clippy::unwrap_used)]

use std::collections::HashSet;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use lopdf::Document;
use lopdf::content::Content;
use pdf_converter_core::pdf::{TextStyle, text_document};
use pdf_converter_core::{
    AppConfig, BatchConverter, BatchManifest, BatchOutcome, ConversionStatus, Converter,
    DocumentRenderer, Error, PrintOptions, RenderSource, RendererInfo, Result, UploadedFile,
};
use tempfile::TempDir;
use zip::ZipArchive;
use zip::write::{SimpleFileOptions, ZipWriter};

const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

// =============================================================================
// Fake Renderers
// =============================================================================

/// A renderer whose engine never starts.
#[derive(Default)]
struct FailingRenderer {
    calls: AtomicUsize,
}

#[async_trait]
impl DocumentRenderer for FailingRenderer {
    fn info(&self) -> RendererInfo {
        RendererInfo {
            name: "failing",
            shared_engine: false,
        }
    }

    async fn render(&self, _source: RenderSource<'_>, _options: &PrintOptions) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(Error::BackendUnavailable("engine could not be launched".to_string()))
    }
}

/// A renderer that records every document and prints a stand-in PDF.
#[derive(Default)]
struct RecordingRenderer {
    documents: Mutex<Vec<(String, PrintOptions)>>,
}

impl RecordingRenderer {
    fn documents(&self) -> Vec<(String, PrintOptions)> {
        self.documents.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentRenderer for RecordingRenderer {
    fn info(&self) -> RendererInfo {
        RendererInfo {
            name: "recording",
            shared_engine: true,
        }
    }

    async fn render(&self, source: RenderSource<'_>, options: &PrintOptions) -> Result<Vec<u8>> {
        let html = match source {
            RenderSource::Html(html) => html.to_string(),
            RenderSource::File(path) => tokio::fs::read_to_string(path).await?,
        };
        self.documents
            .lock()
            .unwrap()
            .push((html, options.clone()));
        text_document(None, "rendered", &TextStyle::plain())
    }
}

/// A renderer that reports success but returns bytes that are not a PDF.
struct GarbageRenderer;

#[async_trait]
impl DocumentRenderer for GarbageRenderer {
    fn info(&self) -> RendererInfo {
        RendererInfo {
            name: "garbage",
            shared_engine: false,
        }
    }

    async fn render(&self, _source: RenderSource<'_>, _options: &PrintOptions) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }
}

/// A renderer that, once another file's PDF has landed in the output
/// directory, deletes it and then prints normally. Every conversion still
/// succeeds, but packaging finds an entry missing.
struct VanishingRenderer {
    output_dir: PathBuf,
    victim: &'static str,
}

#[async_trait]
impl DocumentRenderer for VanishingRenderer {
    fn info(&self) -> RendererInfo {
        RendererInfo {
            name: "vanishing",
            shared_engine: false,
        }
    }

    async fn render(&self, _source: RenderSource<'_>, _options: &PrintOptions) -> Result<Vec<u8>> {
        for _ in 0..500 {
            let produced = std::fs::read_dir(&self.output_dir)?
                .filter_map(std::result::Result::ok)
                .find(|e| e.file_name().to_string_lossy().starts_with(self.victim));
            if let Some(entry) = produced {
                // Give the writer time to finish before unlinking
                tokio::time::sleep(Duration::from_millis(50)).await;
                std::fs::remove_file(entry.path())?;
                return text_document(None, "rendered", &TextStyle::plain());
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        Err(Error::RenderFault(format!("{} never appeared", self.victim)))
    }
}

// =============================================================================
// Test Fixtures
// =============================================================================

/// Output, scratch and upload directories for one test.
struct Dirs {
    output: TempDir,
    scratch: TempDir,
    uploads: TempDir,
}

impl Dirs {
    fn new() -> Self {
        Self {
            output: tempfile::tempdir().unwrap(),
            scratch: tempfile::tempdir().unwrap(),
            uploads: tempfile::tempdir().unwrap(),
        }
    }

    fn batch(&self, renderer: Arc<dyn DocumentRenderer>) -> BatchConverter {
        let mut config = AppConfig::default();
        config.converter.svg_dpi = 96;
        let converter = Converter::with_renderer(&config, renderer);
        BatchConverter::new(Arc::new(converter), self.output.path(), self.scratch.path())
    }

    /// Store an upload on disk the way the web layer does.
    fn upload(&self, name: &str, mime: &str, bytes: &[u8]) -> UploadedFile {
        let path = self
            .uploads
            .path()
            .join(format!("{}-{}", count(self.uploads.path()), name));
        std::fs::write(&path, bytes).unwrap();
        UploadedFile::stored(name, mime, path, bytes.len() as u64)
    }

    fn pdf(&self, name: &str) -> Vec<u8> {
        std::fs::read(self.output.path().join(name)).unwrap()
    }

    fn archive(&self, manifest: &BatchManifest) -> Vec<String> {
        let name = manifest.archive_name.as_deref().unwrap();
        let bytes = std::fs::read(self.output.path().join(name)).unwrap();
        let zip = ZipArchive::new(Cursor::new(bytes)).unwrap();
        zip.file_names().map(ToString::to_string).collect()
    }

    fn assert_clean(&self) {
        assert_eq!(count(self.scratch.path()), 0, "scratch files leaked");
        assert_eq!(count(self.uploads.path()), 0, "uploads not deleted");
    }
}

fn count(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format).unwrap();
    out.into_inner()
}

fn jpeg() -> Vec<u8> {
    encode(
        &DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 30, Rgb([20, 120, 220]))),
        ImageFormat::Jpeg,
    )
}

fn png_with_alpha() -> Vec<u8> {
    encode(
        &DynamicImage::ImageRgba8(RgbaImage::from_pixel(16, 16, Rgba([0, 200, 0, 128]))),
        ImageFormat::Png,
    )
}

fn gif() -> Vec<u8> {
    encode(
        &DynamicImage::ImageRgb8(RgbImage::from_pixel(12, 8, Rgb([255, 0, 0]))),
        ImageFormat::Gif,
    )
}

const SVG: &[u8] = br##"<svg xmlns="http://www.w3.org/2000/svg" width="120" height="60">
  <rect width="120" height="60" fill="#336699"/>
  <circle cx="60" cy="30" r="20" fill="#ffcc00"/>
</svg>"##;

fn zip_of(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, body) in entries {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(body.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn docx(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let style = if i == 0 {
                r#"<w:pPr><w:pStyle w:val="Heading1"/></w:pPr>"#
            } else {
                ""
            };
            format!("<w:p>{style}<w:r><w:t>{text}</w:t></w:r></w:p>")
        })
        .collect();
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
    );
    zip_of(&[("word/document.xml", &xml)])
}

/// Drop the central directory so the container no longer opens.
fn damage(container: &[u8]) -> Vec<u8> {
    let end = container
        .windows(4)
        .position(|w| w == b"PK\x01\x02")
        .unwrap();
    container[..end].to_vec()
}

fn inline_cell(reference: &str, text: &str) -> String {
    format!(r#"<c r="{reference}" t="inlineStr"><is><t>{text}</t></is></c>"#)
}

/// Workbook with one sheet: a header row and `rows` data rows.
fn xlsx(rows: usize) -> Vec<u8> {
    let mut sheet_rows = format!(
        r#"<row r="1">{}{}</row>"#,
        inline_cell("A1", "Item"),
        inline_cell("B1", "Quantity")
    );
    for i in 0..rows {
        let r = i + 2;
        sheet_rows.push_str(&format!(
            r#"<row r="{r}">{}<c r="B{r}"><v>{i}</v></c></row>"#,
            inline_cell(&format!("A{r}"), &format!("item {i}"))
        ));
    }
    workbook(&sheet_rows)
}

/// Workbook with `columns` long-headed columns and two data rows.
fn wide_xlsx(columns: u8) -> Vec<u8> {
    let mut sheet_rows = String::new();
    for r in 1..=3 {
        sheet_rows.push_str(&format!(r#"<row r="{r}">"#));
        for c in 0..columns {
            let column = char::from(b'A' + c);
            let text = if r == 1 {
                format!("Measurement column {c:02}")
            } else {
                format!("value {r}-{c}")
            };
            sheet_rows.push_str(&inline_cell(&format!("{column}{r}"), &text));
        }
        sheet_rows.push_str("</row>");
    }
    workbook(&sheet_rows)
}

fn workbook(sheet_rows: &str) -> Vec<u8> {
    let workbook = r#"<?xml version="1.0" encoding="UTF-8"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Inventory" sheetId="1" r:id="rId1"/></sheets></workbook>"#;
    let rels = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;
    let content_types = r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;
    let sheet = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{sheet_rows}</sheetData></worksheet>"#
    );

    zip_of(&[
        ("[Content_Types].xml", content_types),
        ("xl/workbook.xml", workbook),
        ("xl/_rels/workbook.xml.rels", rels),
        ("xl/worksheets/sheet1.xml", &sheet),
    ])
}

/// Strings shown by each page's text operators.
fn page_strings(pdf: &[u8]) -> Vec<Vec<String>> {
    let doc = Document::load_mem(pdf).unwrap();
    doc.get_pages()
        .values()
        .map(|&page_id| {
            let data = doc.get_page_content(page_id).unwrap();
            Content::decode(&data)
                .unwrap()
                .operations
                .iter()
                .filter(|op| op.operator == "Tj")
                .filter_map(|op| op.operands.first())
                .filter_map(|o| o.as_str().ok())
                .map(|s| String::from_utf8_lossy(s).into_owned())
                .collect()
        })
        .collect()
}

fn page_sizes(pdf: &[u8]) -> Vec<(f32, f32)> {
    let doc = Document::load_mem(pdf).unwrap();
    doc.get_pages()
        .values()
        .map(|&page_id| {
            let page = doc.get_dictionary(page_id).unwrap();
            let media = page.get(b"MediaBox").unwrap().as_array().unwrap();
            let number = |i: usize| media[i].as_float().unwrap();
            (number(2), number(3))
        })
        .collect()
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn test_jpeg_and_unsupported_type() {
    let dirs = Dirs::new();
    let batch = dirs.batch(Arc::new(FailingRenderer::default()));

    let manifest = batch
        .convert_batch(vec![
            dirs.upload("photo.jpg", "image/jpeg", &jpeg()),
            dirs.upload("bundle.zip", "application/zip", b"PK\x03\x04"),
        ])
        .await
        .unwrap();

    assert_eq!(manifest.results.len(), 2);
    assert_eq!(manifest.outcome(), BatchOutcome::Partial);
    assert!(!manifest.success);

    let photo = &manifest.results[0];
    assert_eq!(photo.status, ConversionStatus::Success);
    let pdf_name = photo.pdf_name.as_deref().unwrap();
    assert!(pdf_name.starts_with("photo-") && pdf_name.ends_with(".pdf"));
    assert_eq!(page_sizes(&dirs.pdf(pdf_name)), vec![(40.0, 30.0)]);

    let bundle = &manifest.results[1];
    assert_eq!(bundle.status, ConversionStatus::Error);
    assert!(bundle.pdf_name.is_none());
    assert_eq!(
        bundle.error.as_deref(),
        Some("Unsupported file type: application/zip")
    );

    assert_eq!(dirs.archive(&manifest), vec![pdf_name.to_string()]);
    dirs.assert_clean();
}

#[tokio::test]
async fn test_text_files_through_healthy_renderer() {
    let dirs = Dirs::new();
    let renderer = Arc::new(RecordingRenderer::default());
    let batch = dirs.batch(renderer.clone());

    let texts = [
        "Merhaba dünya: ğüşıöç",
        "Grüße aus Köln, naïve café",
        "Пример текста <b>не тег</b>",
    ];
    let files = texts
        .iter()
        .enumerate()
        .map(|(i, text)| dirs.upload(&format!("note{i}.txt"), "text/plain", text.as_bytes()))
        .collect();

    let manifest = batch.convert_batch(files).await.unwrap();
    assert!(manifest.success);
    assert_eq!(manifest.outcome(), BatchOutcome::Complete);
    assert_eq!(manifest.message, "3 file(s) converted successfully.");
    assert_eq!(dirs.archive(&manifest).len(), 3);

    let documents = renderer.documents();
    assert_eq!(documents.len(), 3);
    assert!(documents.iter().any(|(html, _)| html.contains("Merhaba dünya: ğüşıöç")));
    assert!(documents.iter().any(|(html, _)| html.contains("naïve café")));
    assert!(documents.iter().any(|(html, _)| html.contains("&lt;b&gt;не тег&lt;/b&gt;")));
    assert!(documents.iter().all(|(html, _)| html.contains("white-space: pre-wrap")));
    dirs.assert_clean();
}

#[tokio::test]
async fn test_long_spreadsheet_repeats_header_on_every_page() {
    let dirs = Dirs::new();
    let batch = dirs.batch(Arc::new(FailingRenderer::default()));

    let manifest = batch
        .convert_batch(vec![dirs.upload("stock.xlsx", XLSX, &xlsx(200))])
        .await
        .unwrap();
    assert!(manifest.success, "{:?}", manifest.results);

    let pdf = dirs.pdf(manifest.results[0].pdf_name.as_deref().unwrap());
    let pages = page_strings(&pdf);
    assert!(pages.len() > 1);
    for page in &pages {
        assert!(page.iter().any(|s| s == "Item"), "header missing on a page");
        assert!(page.iter().any(|s| s == "Quantity"));
    }
    assert!(pages[0].iter().any(|s| s == "Inventory"));
    assert!(pages[1].iter().any(|s| s == "Inventory (continued)"));
    assert!(pages.iter().flatten().any(|s| s == "item 199"));
    dirs.assert_clean();
}

#[tokio::test]
async fn test_spreadsheet_through_renderer_uses_table_markup() {
    let dirs = Dirs::new();
    let renderer = Arc::new(RecordingRenderer::default());
    let batch = dirs.batch(renderer.clone());

    let manifest = batch
        .convert_batch(vec![dirs.upload("stock.xlsx", XLSX, &xlsx(3))])
        .await
        .unwrap();
    assert!(manifest.success);

    let documents = renderer.documents();
    assert_eq!(documents.len(), 1);
    let (html, options) = &documents[0];
    assert!(html.contains("<thead><tr><th>Item</th><th>Quantity</th></tr></thead>"));
    assert!(html.contains("<td>item 2</td><td>2</td>"));
    assert!(!options.landscape);
    assert!(options.footer_template.is_some());
    assert!((options.scale - 0.9).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_wide_spreadsheet_prints_landscape() {
    let dirs = Dirs::new();
    let renderer = Arc::new(RecordingRenderer::default());
    let batch = dirs.batch(renderer.clone());

    let manifest = batch
        .convert_batch(vec![dirs.upload("survey.xlsx", XLSX, &wide_xlsx(12))])
        .await
        .unwrap();
    assert!(manifest.success);

    let documents = renderer.documents();
    assert_eq!(documents.len(), 1);
    assert!(documents[0].0.contains("<th>Measurement column 11</th>"));
    assert!(documents[0].1.landscape);
}

#[tokio::test]
async fn test_wide_spreadsheet_drawn_on_landscape_pages() {
    let dirs = Dirs::new();
    let batch = dirs.batch(Arc::new(FailingRenderer::default()));

    let manifest = batch
        .convert_batch(vec![
            dirs.upload("survey.xlsx", XLSX, &wide_xlsx(12)),
            dirs.upload("stock.xlsx", XLSX, &xlsx(3)),
        ])
        .await
        .unwrap();
    assert!(manifest.success, "{:?}", manifest.results);

    let wide = page_sizes(&dirs.pdf(manifest.results[0].pdf_name.as_deref().unwrap()));
    assert!(!wide.is_empty());
    assert!(wide.iter().all(|(width, height)| width > height));

    let narrow = page_sizes(&dirs.pdf(manifest.results[1].pdf_name.as_deref().unwrap()));
    assert!(narrow.iter().all(|(width, height)| width < height));
    dirs.assert_clean();
}

#[tokio::test]
async fn test_empty_batch_is_rejected() {
    let dirs = Dirs::new();
    let batch = dirs.batch(Arc::new(FailingRenderer::default()));

    let err = batch.convert_batch(Vec::new()).await.unwrap_err();
    assert!(matches!(err, Error::EmptyBatch));
    assert!(err.is_batch_level());
    assert_eq!(count(dirs.output.path()), 0);
}

// =============================================================================
// Properties
// =============================================================================

#[tokio::test]
async fn test_one_failing_file_does_not_affect_others() {
    let dirs = Dirs::new();
    let batch = dirs.batch(Arc::new(FailingRenderer::default()));

    let mut files: Vec<UploadedFile> = (0..4)
        .map(|i| dirs.upload(&format!("photo{i}.jpg"), "image/jpeg", &jpeg()))
        .collect();
    files.insert(2, dirs.upload("broken.png", "image/png", b"\x89PNG not really"));

    let manifest = batch.convert_batch(files).await.unwrap();

    let ok: Vec<_> = manifest.results.iter().filter(|r| r.is_success()).collect();
    assert_eq!(ok.len(), 4);
    assert_eq!(manifest.failed(), 1);
    let broken = manifest
        .results
        .iter()
        .find(|r| r.original_filename == "broken.png")
        .unwrap();
    assert!(broken.error.is_some());
    assert!(broken.pdf_name.is_none());

    let mut archived = dirs.archive(&manifest);
    archived.sort();
    let mut expected: Vec<String> = ok.iter().map(|r| r.pdf_name.clone().unwrap()).collect();
    expected.sort();
    assert_eq!(archived, expected);
    dirs.assert_clean();
}

#[tokio::test]
async fn test_every_file_gets_exactly_one_result() {
    let dirs = Dirs::new();
    let batch = dirs.batch(Arc::new(FailingRenderer::default()));

    let files = vec![
        dirs.upload("a.jpg", "image/jpeg", &jpeg()),
        dirs.upload("b.png", "image/png", &png_with_alpha()),
        dirs.upload("c.gif", "image/gif", &gif()),
        dirs.upload("d.svg", "image/svg+xml", SVG),
        dirs.upload("e.txt", "text/plain", b"plain"),
        dirs.upload("f.csv", "text/csv", b"a,b\n1,2"),
        dirs.upload("g.html", "text/html", b"<p>hi</p>"),
        dirs.upload("h.doc", "application/msword", b"\xD0\xCF\x11\xE0"),
        dirs.upload("i.bin", "application/octet-stream", b"\x00\x01"),
    ];
    let names: Vec<String> = files.iter().map(|f| f.original_filename.clone()).collect();

    let manifest = batch.convert_batch(files).await.unwrap();
    assert_eq!(manifest.results.len(), names.len());
    let seen: HashSet<&str> = manifest
        .results
        .iter()
        .map(|r| r.original_filename.as_str())
        .collect();
    assert_eq!(seen.len(), names.len());
    assert!(names.iter().all(|n| seen.contains(n.as_str())));

    let status = |name: &str| {
        manifest
            .results
            .iter()
            .find(|r| r.original_filename == name)
            .unwrap()
            .status
    };
    for name in ["a.jpg", "b.png", "c.gif", "d.svg", "e.txt", "f.csv"] {
        assert_eq!(status(name), ConversionStatus::Success, "{name}");
    }
    for name in ["g.html", "h.doc", "i.bin"] {
        assert_eq!(status(name), ConversionStatus::Error, "{name}");
    }
    dirs.assert_clean();
}

#[tokio::test]
async fn test_no_scratch_left_after_total_failure() {
    let dirs = Dirs::new();
    let batch = dirs.batch(Arc::new(FailingRenderer::default()));

    let manifest = batch
        .convert_batch(vec![
            dirs.upload("page.html", "text/html", b"<h1>x</h1>"),
            dirs.upload("bad.webp", "image/webp", b"RIFF....WEBPjunk"),
        ])
        .await
        .unwrap();

    assert_eq!(manifest.outcome(), BatchOutcome::Failed);
    assert_eq!(manifest.message, "No files could be converted.");
    assert!(manifest.archive_name.is_none());
    assert!(
        manifest.results[0]
            .error
            .as_deref()
            .unwrap()
            .contains("engine could not be launched")
    );
    assert_eq!(count(dirs.output.path()), 0);
    dirs.assert_clean();
}

#[tokio::test]
async fn test_text_falls_back_to_direct_drawing() {
    let dirs = Dirs::new();
    let renderer = Arc::new(FailingRenderer::default());
    let batch = dirs.batch(renderer.clone());

    let manifest = batch
        .convert_batch(vec![dirs.upload("notes.txt", "text/plain", "Şirket raporu\nsecond line".as_bytes())])
        .await
        .unwrap();

    assert!(manifest.success);
    assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
    let pdf = dirs.pdf(manifest.results[0].pdf_name.as_deref().unwrap());
    let strings: Vec<String> = page_strings(&pdf).concat();
    assert_eq!(strings, vec!["Sirket raporu", "second line"]);
}

#[tokio::test]
async fn test_unusable_renderer_output_triggers_fallback() {
    let dirs = Dirs::new();
    let batch = dirs.batch(Arc::new(GarbageRenderer));

    let manifest = batch
        .convert_batch(vec![dirs.upload("data.csv", "text/csv", b"a,b\n1,2\n")])
        .await
        .unwrap();

    assert!(manifest.success);
    let pdf = dirs.pdf(manifest.results[0].pdf_name.as_deref().unwrap());
    assert_eq!(page_strings(&pdf).concat(), vec!["a,b", "1,2"]);
}

#[tokio::test]
async fn test_same_names_get_distinct_pdfs() {
    let dirs = Dirs::new();
    let batch = dirs.batch(Arc::new(FailingRenderer::default()));

    let manifest = batch
        .convert_batch(vec![
            dirs.upload("same.txt", "text/plain", b"first"),
            dirs.upload("same.txt", "text/plain", b"second"),
            dirs.upload("same.txt", "text/plain", b"third"),
        ])
        .await
        .unwrap();

    let names: HashSet<String> = manifest
        .results
        .iter()
        .map(|r| r.pdf_name.clone().unwrap())
        .collect();
    assert_eq!(names.len(), 3);

    let mut bodies: Vec<String> = names
        .iter()
        .map(|n| page_strings(&dirs.pdf(n)).concat().join(" "))
        .collect();
    bodies.sort();
    assert_eq!(bodies, vec!["first", "second", "third"]);
    assert_eq!(dirs.archive(&manifest).len(), 3);
}

// =============================================================================
// Word-processing Documents
// =============================================================================

#[tokio::test]
async fn test_docx_through_renderer_keeps_structure() {
    let dirs = Dirs::new();
    let renderer = Arc::new(RecordingRenderer::default());
    let batch = dirs.batch(renderer.clone());

    let manifest = batch
        .convert_batch(vec![dirs.upload(
            "minutes.docx",
            DOCX,
            &docx(&["Meeting minutes", "Attendees: Ayşe, Jürgen"]),
        )])
        .await
        .unwrap();
    assert!(manifest.success);

    let documents = renderer.documents();
    assert_eq!(documents.len(), 1);
    let (html, options) = &documents[0];
    assert!(html.contains("<h1>Meeting minutes</h1>"));
    assert!(html.contains("<p>Attendees: Ayşe, Jürgen</p>"));
    assert!(options.header_template.as_deref().unwrap().contains("minutes.docx"));
    assert!(options.footer_template.as_deref().unwrap().contains("totalPages"));
    dirs.assert_clean();
}

#[tokio::test]
async fn test_damaged_docx_is_repaired() {
    let dirs = Dirs::new();
    let renderer = Arc::new(RecordingRenderer::default());
    let batch = dirs.batch(renderer.clone());

    let manifest = batch
        .convert_batch(vec![dirs.upload(
            "damaged.docx",
            DOCX,
            &damage(&docx(&["Recovered heading", "Recovered body"])),
        )])
        .await
        .unwrap();

    assert!(manifest.success, "{:?}", manifest.results);
    assert!(renderer.documents()[0].0.contains("Recovered body"));
    dirs.assert_clean();
}

#[tokio::test]
async fn test_docx_without_renderer_is_drawn_directly() {
    let dirs = Dirs::new();
    let renderer = Arc::new(FailingRenderer::default());
    let batch = dirs.batch(renderer.clone());

    let manifest = batch
        .convert_batch(vec![dirs.upload(
            "letter.docx",
            DOCX,
            &docx(&["Dear reader", "Thanks for your patience."]),
        )])
        .await
        .unwrap();

    assert!(manifest.success);
    // Markup and raw-text renderer strategies both tried first
    assert_eq!(renderer.calls.load(Ordering::SeqCst), 2);
    let strings = page_strings(&dirs.pdf(manifest.results[0].pdf_name.as_deref().unwrap())).concat();
    assert_eq!(strings[0], "letter");
    assert!(strings.contains(&"Dear reader".to_string()));
    assert!(strings.contains(&"Thanks for your patience.".to_string()));
}

#[tokio::test]
async fn test_empty_docx_draws_placeholder() {
    let dirs = Dirs::new();
    let batch = dirs.batch(Arc::new(RecordingRenderer::default()));

    let manifest = batch
        .convert_batch(vec![dirs.upload("blank.docx", DOCX, &docx(&[]))])
        .await
        .unwrap();

    assert!(manifest.success);
    let strings = page_strings(&dirs.pdf(manifest.results[0].pdf_name.as_deref().unwrap())).concat();
    assert!(strings.contains(&"This document could not be converted properly.".to_string()));
    assert!(strings.contains(&"Filename: blank.docx".to_string()));
    assert!(strings.contains(&"Please check if the file is a valid Office document.".to_string()));
}

#[tokio::test]
async fn test_unreadable_docx_is_a_soft_failure() {
    let dirs = Dirs::new();
    let batch = dirs.batch(Arc::new(FailingRenderer::default()));

    let manifest = batch
        .convert_batch(vec![
            dirs.upload("photo.jpg", "image/jpeg", &jpeg()),
            dirs.upload("broken.docx", DOCX, b"definitely not a zip container"),
        ])
        .await
        .unwrap();

    let broken = &manifest.results[1];
    assert_eq!(broken.status, ConversionStatus::Error);
    assert!(broken.error.as_deref().unwrap().contains("no recoverable entries"));
    let pdf_name = broken.pdf_name.as_deref().unwrap();

    let strings = page_strings(&dirs.pdf(pdf_name)).concat();
    assert_eq!(strings[0], "Document Conversion Error");
    assert_eq!(strings[1], "Could not convert document: broken.docx");

    assert_eq!(manifest.outcome(), BatchOutcome::Partial);
    assert!(dirs.archive(&manifest).contains(&pdf_name.to_string()));
    dirs.assert_clean();
}

// =============================================================================
// Images
// =============================================================================

#[tokio::test]
async fn test_raster_and_vector_pages_match_image_size() {
    let dirs = Dirs::new();
    let batch = dirs.batch(Arc::new(FailingRenderer::default()));

    let manifest = batch
        .convert_batch(vec![
            dirs.upload("anim.gif", "image/gif", &gif()),
            dirs.upload("logo.svg", "image/svg+xml", SVG),
            dirs.upload("glass.png", "image/png", &png_with_alpha()),
        ])
        .await
        .unwrap();
    assert!(manifest.success, "{:?}", manifest.results);

    let size = |i: usize| page_sizes(&dirs.pdf(manifest.results[i].pdf_name.as_deref().unwrap()));
    assert_eq!(size(0), vec![(12.0, 8.0)]);
    // svg_dpi is 96 in these tests, so one user unit is one pixel
    assert_eq!(size(1), vec![(120.0, 60.0)]);
    assert_eq!(size(2), vec![(16.0, 16.0)]);
    dirs.assert_clean();
}

// =============================================================================
// Batch-level Faults
// =============================================================================

#[tokio::test]
async fn test_missing_output_directory_is_a_setup_fault() {
    let dirs = Dirs::new();
    let missing: PathBuf = dirs.output.path().join("does-not-exist");
    let converter = Converter::with_renderer(
        &AppConfig::default(),
        Arc::new(FailingRenderer::default()),
    );
    let batch = BatchConverter::new(Arc::new(converter), &missing, dirs.scratch.path());

    let err = batch
        .convert_batch(vec![dirs.upload("a.txt", "text/plain", b"x")])
        .await
        .unwrap_err();
    assert!(matches!(&err, Error::Setup { path, .. } if *path == missing));
    assert!(err.is_batch_level());
    dirs.assert_clean();
}

#[tokio::test]
async fn test_packaging_failure_keeps_per_file_results() {
    let dirs = Dirs::new();
    let renderer = Arc::new(VanishingRenderer {
        output_dir: dirs.output.path().to_path_buf(),
        victim: "photo-",
    });
    let batch = dirs.batch(renderer);

    let err = batch
        .convert_batch(vec![
            dirs.upload("photo.jpg", "image/jpeg", &jpeg()),
            dirs.upload("notes.txt", "text/plain", b"meeting notes"),
            dirs.upload("bundle.zip", "application/zip", b"PK\x03\x04"),
        ])
        .await
        .unwrap_err();
    assert!(err.is_batch_level());

    let (reason, results) = match err {
        Error::Packaging { reason, results } => (reason, results),
        other => panic!("expected a packaging fault, got {other:?}"),
    };
    assert!(reason.contains("photo-"), "{reason}");
    let summary: Vec<(&str, ConversionStatus)> = results
        .iter()
        .map(|r| (r.original_filename.as_str(), r.status))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("photo.jpg", ConversionStatus::Success),
            ("notes.txt", ConversionStatus::Success),
            ("bundle.zip", ConversionStatus::Error),
        ]
    );

    let leftovers: Vec<String> = std::fs::read_dir(dirs.output.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert!(leftovers.iter().all(|name| !name.ends_with(".zip")), "{leftovers:?}");
    assert_eq!(leftovers, vec![results[1].pdf_name.clone().unwrap()]);
    dirs.assert_clean();
}

#[tokio::test]
async fn test_in_memory_uploads_are_converted() {
    let dirs = Dirs::new();
    let batch = dirs.batch(Arc::new(FailingRenderer::default()));

    let manifest = batch
        .convert_batch(vec![UploadedFile::in_memory("memo.txt", "text/plain", "memo".as_bytes().to_vec())])
        .await
        .unwrap();
    assert!(manifest.success);

    let archive = manifest.archive_name.as_deref().unwrap();
    assert!(archive.starts_with("converted_"));
    let mut zip = ZipArchive::new(Cursor::new(dirs.pdf(archive))).unwrap();
    let mut entry = zip.by_index(0).unwrap();
    let mut body = Vec::new();
    entry.read_to_end(&mut body).unwrap();
    assert!(body.starts_with(b"%PDF"));
}
