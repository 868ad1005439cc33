//! Periodic removal of stale uploads, outputs and scratch leftovers.
//!
//! Downloads delete what they serve, but abandoned batches and crashed
//! conversions leave files behind; the sweeper reclaims them by age.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tracing::{debug, info, warn};

use crate::state::AppState;

/// Delete entries of `dir` last modified more than `max_age` ago.
///
/// Dot-files are skipped: they are directory probes and in-progress
/// temporaries. Returns the number of entries removed.
pub async fn sweep_dir(dir: &Path, max_age: Duration) -> usize {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot sweep {}: {}", dir.display(), e);
            return 0;
        }
    };

    let now = SystemTime::now();
    let mut removed = 0;
    while let Ok(Some(entry)) = entries.next_entry().await {
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        let Ok(metadata) = entry.metadata().await else {
            continue;
        };
        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or_default();
        if age <= max_age {
            continue;
        }

        let path = entry.path();
        let result = if metadata.is_dir() {
            tokio::fs::remove_dir_all(&path).await
        } else {
            tokio::fs::remove_file(&path).await
        };
        match result {
            Ok(()) => {
                debug!("Swept {}", path.display());
                removed += 1;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to sweep {}: {}", path.display(), e),
        }
    }
    removed
}

/// Sweep every directory once.
pub async fn sweep(dirs: &[PathBuf], max_age: Duration) -> usize {
    let mut removed = 0;
    for dir in dirs {
        removed += sweep_dir(dir, max_age).await;
    }
    removed
}

/// Run the sweeper forever on the configured interval.
pub fn spawn(state: Arc<AppState>) -> tokio::task::JoinHandle<()> {
    let interval = Duration::from_secs(state.config.storage.sweep_interval_secs.max(1));
    let max_age = Duration::from_secs(state.config.storage.max_file_age_secs);
    let dirs = state.directories();

    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            let removed = sweep(&dirs, max_age).await;
            if removed > 0 {
                info!("Sweeper removed {} stale file(s)", removed);
            }
        }
    })
}
