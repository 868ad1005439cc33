//! Scoped tracking of intermediate artifacts.
//!
//! Every single-file conversion owns one [`ScratchSet`]. Transcoded images,
//! generated HTML and repaired office containers are written through it, and
//! all of them are deleted when the set is dropped, whichever way the
//! conversion exits (success, handled failure, `?` early return or panic).
//!
//! The artifacts live in a private directory created under the caller's
//! scratch directory, so concurrent conversions never share file names.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::Result;

/// RAII registry of the temporary files created for one conversion.
pub struct ScratchSet {
    /// Private directory, removed last on drop
    dir: Option<TempDir>,
    /// Registered artifacts in creation order
    paths: Vec<PathBuf>,
}

impl ScratchSet {
    /// Create a fresh private directory under `scratch_root`.
    pub fn new(scratch_root: &Path) -> io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("conv-")
            .tempdir_in(scratch_root)?;
        debug!("Created scratch set at {}", dir.path().display());
        Ok(Self {
            dir: Some(dir),
            paths: Vec::new(),
        })
    }

    /// Directory holding this set's artifacts.
    pub fn dir(&self) -> &Path {
        self.dir.as_ref().map_or_else(|| Path::new(""), TempDir::path)
    }

    /// Reserve and register a path for a new artifact.
    ///
    /// Names are prefixed with a sequence number so repeated names within
    /// one conversion do not clash.
    pub fn path_for(&mut self, name: &str) -> PathBuf {
        let path = self.dir().join(format!("{:02}-{name}", self.paths.len()));
        self.paths.push(path.clone());
        path
    }

    /// Register an artifact created elsewhere.
    pub fn register(&mut self, path: impl Into<PathBuf>) {
        self.paths.push(path.into());
    }

    /// Write `bytes` to a new registered artifact and return its path.
    pub async fn write(&mut self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.path_for(name);
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

impl Drop for ScratchSet {
    fn drop(&mut self) {
        for path in self.paths.drain(..) {
            remove_artifact(&path);
        }

        if let Some(dir) = self.dir.take() {
            let shown = dir.path().display().to_string();
            if let Err(e) = dir.close()
                && e.kind() != io::ErrorKind::NotFound
            {
                warn!("Failed to remove scratch directory {}: {}", shown, e);
            }
        }
    }
}

/// Delete one artifact; an already missing file is fine.
fn remove_artifact(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!("Removed scratch file {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove scratch file {}: {}", path.display(), e),
    }
}
