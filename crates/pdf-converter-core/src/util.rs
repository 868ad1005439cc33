//! Utility functions shared across the crate.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Get the user's config directory following XDG conventions.
///
/// Returns `$XDG_CONFIG_HOME` if set, otherwise `$HOME/.config`.
pub fn config_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
}

/// Milliseconds since the Unix epoch, used to stamp generated file names.
pub fn unix_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Last path component of a user-supplied file name.
///
/// Both `/` and `\` count as separators, whatever the host platform.
pub fn base_name(original_filename: &str) -> &str {
    original_filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original_filename)
}

/// Reduce a user-supplied file name to a safe stem without extension.
///
/// Path components are dropped and anything that is not alphanumeric,
/// `-`, `_`, `.` or a space becomes `_`.
pub fn safe_stem(original_filename: &str) -> String {
    let name = base_name(original_filename);
    let stem = Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name);

    let cleaned: String = stem
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_matches([' ', '.']).to_string();
    if cleaned.is_empty() {
        "document".to_string()
    } else {
        cleaned
    }
}

/// Create `<stem>-<millis>.<ext>` (or `<stem>_<millis>.<ext>` when
/// `separator` is `'_'`) in `dir` without overwriting anything.
///
/// On collision a numeric suffix is appended: `-2`, `-3`, ...
pub fn create_unique(
    dir: &Path,
    stem: &str,
    separator: char,
    extension: &str,
) -> io::Result<(PathBuf, File)> {
    let base = format!("{stem}{separator}{}", unix_millis());

    for attempt in 1..=1000_u32 {
        let name = if attempt == 1 {
            format!("{base}.{extension}")
        } else {
            format!("{base}-{attempt}.{extension}")
        };
        let path = dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(e),
        }
    }

    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free file name for {base}.{extension}"),
    ))
}

/// File name component of a path as an owned string.
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
