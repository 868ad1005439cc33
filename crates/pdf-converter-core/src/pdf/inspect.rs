//! Sanity checks on PDF bytes produced by a strategy.

use lopdf::Document;

use crate::error::{Error, Result};

/// Number of pages in a PDF byte stream.
///
/// A stream that does not parse, or parses to zero pages, is a render fault:
/// the producing strategy gave no usable output.
pub fn page_count(bytes: &[u8]) -> Result<usize> {
    if bytes.is_empty() {
        return Err(Error::RenderFault("empty PDF output".to_string()));
    }
    let doc = Document::load_mem(bytes)
        .map_err(|e| Error::RenderFault(format!("unreadable PDF output: {e}")))?;
    match doc.get_pages().len() {
        0 => Err(Error::RenderFault("PDF output has no pages".to_string())),
        n => Ok(n),
    }
}
