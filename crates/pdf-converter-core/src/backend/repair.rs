//! Byte-level recovery of damaged zip containers (DOCX, XLSX, ODS).
//!
//! A container whose central directory is missing or corrupt can often
//! still be read entry by entry from its local file headers. Every entry
//! that decodes cleanly is copied into a fresh, well-formed archive.

use std::collections::HashSet;
use std::io::{Cursor, Read, Write};

use tracing::debug;
use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

use crate::error::{Error, Result};

const LOCAL_HEADER: &[u8] = b"PK\x03\x04";

/// Offsets of every local file header signature in `bytes`.
fn local_headers(bytes: &[u8]) -> impl Iterator<Item = usize> + '_ {
    bytes
        .windows(LOCAL_HEADER.len())
        .enumerate()
        .filter(|(_, window)| *window == LOCAL_HEADER)
        .map(|(offset, _)| offset)
}

/// Re-wrap the readable entries of a damaged zip into a new archive.
///
/// Fails with [`Error::MalformedContainer`] when nothing can be recovered.
pub fn repair_zip(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut seen = HashSet::new();

    for offset in local_headers(bytes) {
        let mut reader = Cursor::new(&bytes[offset..]);
        let mut entry = match zip::read::read_zipfile_from_stream(&mut reader) {
            Ok(Some(entry)) => entry,
            Ok(None) => continue,
            Err(e) => {
                debug!("Skipping unreadable entry at offset {}: {}", offset, e);
                continue;
            }
        };
        if entry.is_dir() {
            continue;
        }

        let name = entry.name().to_string();
        let mut data = Vec::new();
        if let Err(e) = entry.read_to_end(&mut data) {
            debug!("Skipping corrupt entry '{}': {}", name, e);
            continue;
        }
        if !seen.insert(name.clone()) {
            continue;
        }

        writer
            .start_file(name.as_str(), options)
            .map_err(|e| Error::MalformedContainer(format!("cannot rebuild archive: {e}")))?;
        writer.write_all(&data)?;
    }

    if seen.is_empty() {
        return Err(Error::MalformedContainer(
            "no recoverable entries found".to_string(),
        ));
    }
    debug!("Recovered {} container entries", seen.len());

    let cursor = writer
        .finish()
        .map_err(|e| Error::MalformedContainer(format!("cannot rebuild archive: {e}")))?;
    Ok(cursor.into_inner())
}
