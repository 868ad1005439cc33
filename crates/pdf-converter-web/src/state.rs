use std::path::PathBuf;

use anyhow::{Context, Result};
use pdf_converter_core::{AppConfig, BatchConverter};
use tracing::info;

/// Global application state
pub struct AppState {
    /// Loaded configuration (limits and storage locations)
    pub config: AppConfig,
    /// Shared orchestrator; owns the converter and its renderer
    pub batch: BatchConverter,
}

impl AppState {
    /// Create the storage directories and build the converter.
    pub fn new(config: AppConfig) -> Result<Self> {
        let batch = BatchConverter::from_config(&config);
        Self::with_batch(config, batch)
    }

    /// Use an already built orchestrator (tests inject fake renderers).
    pub fn with_batch(config: AppConfig, batch: BatchConverter) -> Result<Self> {
        let state = Self { config, batch };
        for dir in state.directories() {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        }
        info!(
            "Storage: uploads={} output={} scratch={}",
            state.config.storage.upload_dir.display(),
            state.batch.output_dir().display(),
            state.batch.scratch_dir().display()
        );
        Ok(state)
    }

    /// Every directory the server writes into, swept periodically.
    pub fn directories(&self) -> Vec<PathBuf> {
        vec![
            self.config.storage.upload_dir.clone(),
            self.batch.output_dir().to_path_buf(),
            self.batch.scratch_dir().to_path_buf(),
        ]
    }
}
