//! Word-processing document extraction.
//!
//! Reads `word/document.xml` out of a DOCX container and keeps the parts
//! that matter for a readable PDF: headings, paragraphs with bold and
//! italic runs, line breaks, tabs and simple tables. Styles, images,
//! numbering and section layout are dropped.

use std::io::{Cursor, Read};

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use zip::ZipArchive;

use crate::error::{Error, Result};

const DOCUMENT_PART: &str = "word/document.xml";

/// A run of text sharing one formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
}

/// A top-level block of the document body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Heading level (1-6) and its runs
    Heading(u8, Vec<Run>),
    Paragraph(Vec<Run>),
    /// Rows of cell texts
    Table(Vec<Vec<String>>),
}

/// The extracted content of one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocxDocument {
    pub blocks: Vec<Block>,
}

fn runs_text(runs: &[Run]) -> String {
    runs.iter().map(|r| r.text.as_str()).collect()
}

impl DocxDocument {
    /// Parse a DOCX container.
    ///
    /// A byte stream that is not a readable zip, or that lacks the main
    /// document part, is a [`Error::MalformedContainer`].
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| Error::MalformedContainer(format!("not a zip container: {e}")))?;
        let mut xml = String::new();
        archive
            .by_name(DOCUMENT_PART)
            .map_err(|e| Error::MalformedContainer(format!("{DOCUMENT_PART}: {e}")))?
            .read_to_string(&mut xml)
            .map_err(|e| Error::MalformedContainer(format!("{DOCUMENT_PART}: {e}")))?;
        Self::from_xml(&xml)
    }

    /// Parse the body of a `word/document.xml` part.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let mut parser = BodyParser::default();
        let mut reader = Reader::from_str(xml);

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => parser.start(&e, false),
                Ok(Event::Empty(e)) => parser.start(&e, true),
                Ok(Event::End(e)) => parser.end(e.local_name().as_ref()),
                Ok(Event::Text(t)) if parser.in_text => {
                    let text = t
                        .unescape()
                        .map_err(|e| Error::MalformedContainer(format!("bad text: {e}")))?;
                    parser.push_text(&text);
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(Error::MalformedContainer(format!(
                        "invalid document XML at byte {}: {e}",
                        reader.error_position()
                    )));
                }
            }
        }

        Ok(Self {
            blocks: parser.blocks,
        })
    }

    /// True when the document has no visible text.
    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(|block| match block {
            Block::Heading(_, runs) | Block::Paragraph(runs) => {
                runs.iter().all(|r| r.text.trim().is_empty())
            }
            Block::Table(rows) => rows.iter().flatten().all(|c| c.trim().is_empty()),
        })
    }

    /// Plain text, one line per paragraph and tab-separated table cells.
    pub fn to_text(&self) -> String {
        let mut lines = Vec::new();
        for block in &self.blocks {
            match block {
                Block::Heading(_, runs) | Block::Paragraph(runs) => lines.push(runs_text(runs)),
                Block::Table(rows) => {
                    lines.extend(rows.iter().map(|row| row.join("\t")));
                }
            }
        }
        lines.join("\n")
    }
}

/// Heading level for a paragraph style id such as `Heading2` or `Title`.
fn heading_level(style: &str) -> Option<u8> {
    if style.eq_ignore_ascii_case("title") {
        return Some(1);
    }
    let lower = style.to_ascii_lowercase();
    let level: u8 = lower.strip_prefix("heading")?.trim().parse().ok()?;
    (1..=6).contains(&level).then_some(level)
}

/// `w:val` of a toggle property; absent means on.
fn toggle_value(e: &BytesStart<'_>) -> bool {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == b"val")
        .is_none_or(|a| !matches!(a.value.as_ref(), b"0" | b"false" | b"off" | b"none"))
}

fn attribute(e: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == name)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

#[derive(Default)]
struct BodyParser {
    blocks: Vec<Block>,
    style: Option<String>,
    runs: Vec<Run>,
    bold: bool,
    italic: bool,
    in_text: bool,
    table_depth: usize,
    rows: Vec<Vec<String>>,
}

impl BodyParser {
    fn start(&mut self, e: &BytesStart<'_>, empty: bool) {
        match e.local_name().as_ref() {
            b"p" if !empty => {
                self.style = None;
                self.runs.clear();
            }
            b"pStyle" => self.style = attribute(e, b"val"),
            b"r" if !empty => {
                self.bold = false;
                self.italic = false;
            }
            b"b" => self.bold = toggle_value(e),
            b"i" => self.italic = toggle_value(e),
            b"t" if !empty => self.in_text = true,
            b"tab" if empty => self.push_text("\t"),
            b"br" | b"cr" => self.push_text("\n"),
            b"tbl" if !empty => {
                self.table_depth += 1;
                if self.table_depth == 1 {
                    self.rows.clear();
                }
            }
            b"tr" if !empty && self.table_depth == 1 => self.rows.push(Vec::new()),
            b"tc" if !empty && self.table_depth == 1 => {
                if let Some(row) = self.rows.last_mut() {
                    row.push(String::new());
                }
            }
            _ => {}
        }
    }

    fn end(&mut self, name: &[u8]) {
        match name {
            b"t" => self.in_text = false,
            b"p" => self.finish_paragraph(),
            b"tbl" => {
                self.table_depth = self.table_depth.saturating_sub(1);
                if self.table_depth == 0 && !self.rows.is_empty() {
                    self.blocks.push(Block::Table(std::mem::take(&mut self.rows)));
                }
            }
            _ => {}
        }
    }

    fn push_text(&mut self, text: &str) {
        match self.runs.last_mut() {
            Some(last) if last.bold == self.bold && last.italic == self.italic => {
                last.text.push_str(text);
            }
            _ => self.runs.push(Run {
                text: text.to_string(),
                bold: self.bold,
                italic: self.italic,
            }),
        }
    }

    fn finish_paragraph(&mut self) {
        let runs = std::mem::take(&mut self.runs);
        if self.table_depth > 0 {
            if let Some(cell) = self.rows.last_mut().and_then(|row| row.last_mut()) {
                if !cell.is_empty() {
                    cell.push('\n');
                }
                cell.push_str(&runs_text(&runs));
            }
            return;
        }
        if runs.iter().all(|r| r.text.is_empty()) {
            return;
        }
        match self.style.take().as_deref().and_then(heading_level) {
            Some(level) => self.blocks.push(Block::Heading(level, runs)),
            None => self.blocks.push(Block::Paragraph(runs)),
        }
    }
}
