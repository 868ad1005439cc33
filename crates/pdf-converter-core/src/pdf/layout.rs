//! Direct drawing of text, tables and error notices.
//!
//! These are the renderer-free fallbacks: everything is laid out with the
//! standard fonts on A4 pages, text is transliterated to ASCII first and
//! pages are added until the content is exhausted.
//!
//! PDF uses a bottom-left origin, so the cursor `y` starts near the page
//! height and decreases as lines are emitted.

use super::font::{StandardFont, escape_literal, to_ascii};
use super::writer::{A4, PageSize, PdfWriter};
use crate::error::Result;

// =============================================================================
// Layout Constants
// =============================================================================

const TABLE_FONT_SIZE: f32 = 9.0;
const TABLE_TITLE_SIZE: f32 = 14.0;
const TABLE_MARGIN: f32 = 50.0;
/// Vertical padding above plus below a cell's text.
const CELL_GAP: f32 = 8.0;
const CELL_PADDING_X: f32 = 4.0;
const MAX_COLUMN_WIDTH: f32 = 120.0;
const MIN_COLUMN_WIDTH: f32 = 24.0;
const MAX_CELL_CHARS: usize = 100;
const HEADER_GRAY: f32 = 0.9;
const BORDER_GRAY: f32 = 0.7;
const ZEBRA_GRAY: f32 = 0.97;

const TITLE_SIZE: f32 = 16.0;

// =============================================================================
// Text Documents
// =============================================================================

/// Typography for a directly drawn text document.
#[derive(Debug, Clone, Copy)]
pub struct TextStyle {
    pub font: StandardFont,
    pub font_size: f32,
    /// Line height as a multiple of the font size
    pub line_height: f32,
    pub margin: f32,
    /// Extra space after each paragraph, as a multiple of the font size
    pub paragraph_gap: f32,
}

impl TextStyle {
    /// Plain text and CSV fallback: Helvetica 11pt, 1.3 line height.
    pub const fn plain() -> Self {
        Self {
            font: StandardFont::Regular,
            font_size: 11.0,
            line_height: 1.3,
            margin: 50.0,
            paragraph_gap: 0.3,
        }
    }

    /// Extracted document text: Helvetica 11pt, 1.4 line height.
    pub const fn document() -> Self {
        Self {
            line_height: 1.4,
            ..Self::plain()
        }
    }
}

/// One laid-out line, or the gap that closes a paragraph.
#[derive(Debug, Clone, PartialEq)]
enum Line {
    Text(String),
    ParagraphEnd,
}

/// Break `text` into lines no wider than `max_width`.
///
/// Words wider than a whole line are split between characters.
pub fn wrap_text(text: &str, font: StandardFont, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };

        if font.text_width(&candidate, size) <= max_width {
            current = candidate;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }

        if font.text_width(word, size) <= max_width {
            current = word.to_string();
        } else {
            for c in word.chars() {
                current.push(c);
                if font.text_width(&current, size) > max_width && current.chars().count() > 1 {
                    current.pop();
                    lines.push(std::mem::take(&mut current));
                    current.push(c);
                }
            }
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn layout_paragraphs(text: &str, style: &TextStyle, max_width: f32) -> Vec<Line> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let wrapped = wrap_text(paragraph, style.font, style.font_size, max_width);
        if wrapped.is_empty() {
            lines.push(Line::Text(String::new()));
        } else {
            lines.extend(wrapped.into_iter().map(Line::Text));
        }
        lines.push(Line::ParagraphEnd);
    }
    lines
}

fn write_text(content: &mut String, font: StandardFont, size: f32, x: f32, y: f32, text: &str) {
    content.push_str(&format!(
        "BT /{} {size} Tf {x} {y} Td ({}) Tj ET\n",
        font.resource_name(),
        escape_literal(text)
    ));
}

/// Draw `body` (with an optional bold title) onto as many A4 pages as needed.
pub fn text_document(title: Option<&str>, body: &str, style: &TextStyle) -> Result<Vec<u8>> {
    let page = A4;
    let max_width = page.width - 2.0 * style.margin;
    let line_height = style.font_size * style.line_height;
    let body = to_ascii(body);
    let lines = layout_paragraphs(&body, style, max_width);

    let mut writer = PdfWriter::new();
    let mut content = String::new();
    let mut y = page.height - style.margin;

    if let Some(title) = title {
        let title = to_ascii(title);
        for line in wrap_text(&title, StandardFont::Bold, TITLE_SIZE, max_width) {
            if y - TITLE_SIZE < style.margin {
                writer.add_page(page, std::mem::take(&mut content), &[]);
                y = page.height - style.margin;
            }
            y -= TITLE_SIZE;
            write_text(&mut content, StandardFont::Bold, TITLE_SIZE, style.margin, y, &line);
            y -= TITLE_SIZE * 0.4;
        }
        y -= style.font_size;
    }

    for line in lines {
        match line {
            Line::Text(text) => {
                if y - line_height < style.margin {
                    writer.add_page(page, std::mem::take(&mut content), &[]);
                    y = page.height - style.margin;
                }
                y -= line_height;
                if !text.is_empty() {
                    write_text(&mut content, style.font, style.font_size, style.margin, y, &text);
                }
            }
            Line::ParagraphEnd => y -= style.font_size * style.paragraph_gap,
        }
    }

    writer.add_page(page, content, &[]);
    writer.finish()
}

// =============================================================================
// Error Page
// =============================================================================

/// Single page explaining why a document could not be converted.
pub fn error_page(file_name: &str, message: &str) -> Result<Vec<u8>> {
    let page = A4;
    let margin = 50.0;
    let max_width = page.width - 2.0 * margin;
    let mut content = String::new();
    let mut y = page.height - margin - TITLE_SIZE;

    content.push_str("0.8 0 0 rg\n");
    write_text(&mut content, StandardFont::Bold, TITLE_SIZE, margin, y, "Document Conversion Error");
    content.push_str("0 0 0 rg\n");
    y -= TITLE_SIZE * 2.0;

    let notice = format!("Could not convert document: {}", to_ascii(file_name));
    for line in wrap_text(&notice, StandardFont::Regular, 12.0, max_width) {
        write_text(&mut content, StandardFont::Regular, 12.0, margin, y, &line);
        y -= 12.0 * 1.4;
    }
    y -= 6.0;

    content.push_str("0.3 0.3 0.3 rg\n");
    let detail = format!("Error: {}", to_ascii(message));
    for line in wrap_text(&detail, StandardFont::Regular, 10.0, max_width) {
        if y < margin {
            break;
        }
        write_text(&mut content, StandardFont::Regular, 10.0, margin, y, &line);
        y -= 10.0 * 1.4;
    }

    let mut writer = PdfWriter::new();
    writer.add_page(page, content, &[]);
    writer.finish()
}

// =============================================================================
// Tables
// =============================================================================

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Cut `text` until it fits `width`.
fn fit_cell(text: &str, font: StandardFont, size: f32, width: f32) -> String {
    let mut fitted = text.to_string();
    while !fitted.is_empty() && font.text_width(&fitted, size) > width {
        fitted.pop();
    }
    fitted
}

/// Column widths from content length, scaled down to fit `available`.
fn column_widths(rows: &[Vec<String>], columns: usize, available: f32) -> Vec<f32> {
    let mut widths = vec![MIN_COLUMN_WIDTH; columns];
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            let wanted = (StandardFont::Bold.text_width(cell, TABLE_FONT_SIZE)
                + 2.0 * CELL_PADDING_X)
                .min(MAX_COLUMN_WIDTH);
            widths[i] = widths[i].max(wanted);
        }
    }

    let total: f32 = widths.iter().sum();
    if total > available {
        let scale = available / total;
        for w in &mut widths {
            *w *= scale;
        }
    }
    widths
}

struct TablePainter<'a> {
    page: PageSize,
    sheet_name: &'a str,
    widths: Vec<f32>,
    row_height: f32,
    content: String,
    y: f32,
}

impl TablePainter<'_> {
    fn start_page(&mut self, continued: bool) {
        let title = if continued {
            format!("{} (continued)", self.sheet_name)
        } else {
            self.sheet_name.to_string()
        };
        self.y = self.page.height - TABLE_MARGIN - TABLE_TITLE_SIZE;
        write_text(
            &mut self.content,
            StandardFont::Bold,
            TABLE_TITLE_SIZE,
            TABLE_MARGIN,
            self.y,
            &title,
        );
        self.y -= TABLE_TITLE_SIZE;
    }

    fn fits_row(&self) -> bool {
        self.y - self.row_height >= TABLE_MARGIN
    }

    fn draw_row(&mut self, cells: &[String], header: bool, shaded: bool) {
        let top = self.y;
        let bottom = top - self.row_height;
        let width: f32 = self.widths.iter().sum();

        if header {
            self.content.push_str(&format!(
                "{HEADER_GRAY} g {BORDER_GRAY} G 0.5 w {TABLE_MARGIN} {bottom} {width} {} re B 0 g\n",
                self.row_height
            ));
        } else if shaded {
            self.content.push_str(&format!(
                "{ZEBRA_GRAY} g {TABLE_MARGIN} {bottom} {width} {} re f 0 g\n",
                self.row_height
            ));
        }

        let font = if header {
            StandardFont::Bold
        } else {
            StandardFont::Regular
        };
        let baseline = bottom + CELL_GAP / 2.0 + TABLE_FONT_SIZE * 0.2;
        let mut x = TABLE_MARGIN;
        for (i, column_width) in self.widths.iter().enumerate() {
            if let Some(cell) = cells.get(i) {
                let text = fit_cell(cell, font, TABLE_FONT_SIZE, column_width - 2.0 * CELL_PADDING_X);
                if !text.is_empty() {
                    write_text(&mut self.content, font, TABLE_FONT_SIZE, x + CELL_PADDING_X, baseline, &text);
                }
            }
            x += column_width;
        }

        self.y = bottom;
    }
}

/// Lay out a sheet as a table whose first row is the header.
///
/// The header row is shaded and repeated at the top of every continuation
/// page; data rows alternate between white and light gray. Wide sheets
/// are drawn on landscape pages.
pub fn table_document(sheet_name: &str, rows: &[Vec<String>], landscape: bool) -> Result<Vec<u8>> {
    let page = if landscape { A4.landscape() } else { A4 };
    let rows: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|cell| truncate_chars(&to_ascii(cell).replace('\n', " "), MAX_CELL_CHARS))
                .collect()
        })
        .collect();
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let sheet_name = to_ascii(sheet_name);

    let mut painter = TablePainter {
        page,
        sheet_name: &sheet_name,
        widths: column_widths(&rows, columns, page.width - 2.0 * TABLE_MARGIN),
        row_height: TABLE_FONT_SIZE + CELL_GAP,
        content: String::new(),
        y: 0.0,
    };
    let mut writer = PdfWriter::new();
    painter.start_page(false);

    let Some((header, body)) = rows.split_first() else {
        painter.y -= TABLE_FONT_SIZE;
        let y = painter.y;
        write_text(&mut painter.content, StandardFont::Regular, TABLE_FONT_SIZE, TABLE_MARGIN, y, "This sheet is empty.");
        writer.add_page(page, painter.content, &[]);
        return writer.finish();
    };

    painter.draw_row(header, true, false);
    for (i, row) in body.iter().enumerate() {
        if !painter.fits_row() {
            writer.add_page(page, std::mem::take(&mut painter.content), &[]);
            painter.start_page(true);
            painter.draw_row(header, true, false);
        }
        painter.draw_row(row, false, i % 2 == 0);
    }

    writer.add_page(page, painter.content, &[]);
    writer.finish()
}
