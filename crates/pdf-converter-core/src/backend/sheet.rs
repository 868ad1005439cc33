//! Spreadsheet extraction with calamine.
//!
//! Only the first worksheet is converted. Cells are turned into display
//! strings up front so both the HTML table and the directly drawn table
//! work from the same rows.

use std::io::Cursor;

use calamine::{Data, Reader, open_workbook_auto_from_rs};

use crate::error::{Error, Result};

/// Portrait A4 content width at 10 mm margins, in millimetres.
const PORTRAIT_CONTENT_MM: f64 = 190.0;
/// Print scale applied by the HTML renderer.
pub const PRINT_SCALE: f64 = 0.9;
/// Rough width of one character of 10px table text, in millimetres.
const CHAR_MM: f64 = 2.0;
const CELL_PADDING_MM: f64 = 3.0;
const MAX_ESTIMATED_CHARS: usize = 40;

/// The first worksheet of a workbook as display strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    pub name: String,
    /// First row is treated as the header
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    /// Read the first worksheet of an XLSX, XLS or ODS workbook.
    pub fn read_first(bytes: &[u8]) -> Result<Self> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
            .map_err(|e| Error::MalformedContainer(format!("unreadable workbook: {e}")))?;

        let name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| Error::MalformedContainer("workbook has no sheets".to_string()))?;
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| Error::MalformedContainer(format!("sheet '{name}': {e}")))?;

        let rows = range
            .rows()
            .map(|row| row.iter().map(cell_text).collect())
            .collect();
        Ok(Self { name, rows })
    }

    pub fn header(&self) -> &[String] {
        match self.rows.first() {
            Some(row) => row,
            None => &[],
        }
    }

    pub fn body(&self) -> &[Vec<String>] {
        self.rows.get(1..).unwrap_or_default()
    }

    /// Whether the table is unlikely to fit a portrait page.
    pub fn is_wide(&self) -> bool {
        let columns = self.rows.iter().map(Vec::len).max().unwrap_or(0);
        #[allow(clippy::cast_precision_loss)]
        let estimated: f64 = (0..columns)
            .map(|col| {
                let chars = self
                    .rows
                    .iter()
                    .filter_map(|row| row.get(col))
                    .map(|cell| cell.chars().count())
                    .max()
                    .unwrap_or(0)
                    .clamp(3, MAX_ESTIMATED_CHARS);
                chars as f64 * CHAR_MM + CELL_PADDING_MM
            })
            .sum();
        estimated * PRINT_SCALE > PORTRAIT_CONTENT_MM
    }
}

/// Display form of one cell.
pub fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Float(f) => format_number(*f),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string().to_uppercase(),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(value) if value.time() == chrono::NaiveTime::MIN => {
                value.format("%Y-%m-%d").to_string()
            }
            Some(value) => value.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => format_number(dt.as_f64()),
        },
        Data::Error(e) => e.to_string(),
    }
}

/// Integral values lose their fractional part: `3.0` prints as `3`.
#[allow(clippy::cast_possible_truncation)]
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        (value as i64).to_string()
    } else {
        value.to_string()
    }
}
