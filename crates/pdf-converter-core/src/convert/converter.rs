use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::resolver::{FormatResolver, Strategy, normalize_mime};
use super::strategy::Job;
use crate::backend::{DocumentRenderer, create_renderer};
use crate::batch::{ConversionResult, UploadedFile};
use crate::config::{AppConfig, ConverterConfig};
use crate::error::{Error, Result};
use crate::pdf::page_count;
use crate::scratch::ScratchSet;
use crate::util::{create_unique, file_name};

/// Runs the strategy chain for single files.
///
/// Stateless between calls apart from the shared renderer handle, so one
/// instance serves every concurrent conversion.
pub struct Converter {
    pub(super) resolver: FormatResolver,
    pub(super) renderer: Arc<dyn DocumentRenderer>,
    pub(super) svg_dpi: u32,
    strategy_timeout: Option<Duration>,
    /// Bounds CPU-heavy work running on the blocking pool
    cpu_pool: Arc<Semaphore>,
}

impl Converter {
    /// Build a converter with the renderer described by `config`.
    pub fn new(config: &AppConfig) -> Self {
        Self::with_renderer(config, create_renderer(&config.renderer))
    }

    /// Build a converter around an existing renderer.
    pub fn with_renderer(config: &AppConfig, renderer: Arc<dyn DocumentRenderer>) -> Self {
        let resolver = FormatResolver::new().with_aliases(&config.formats);
        Self::from_parts(&config.converter, resolver, renderer)
    }

    pub fn from_parts(
        config: &ConverterConfig,
        resolver: FormatResolver,
        renderer: Arc<dyn DocumentRenderer>,
    ) -> Self {
        Self {
            resolver,
            renderer,
            svg_dpi: config.svg_dpi,
            strategy_timeout: config.strategy_timeout_secs.map(Duration::from_secs),
            cpu_pool: Arc::new(Semaphore::new(config.cpu_workers.max(1))),
        }
    }

    pub const fn resolver(&self) -> &FormatResolver {
        &self.resolver
    }

    pub fn renderer(&self) -> &Arc<dyn DocumentRenderer> {
        &self.renderer
    }

    /// Convert one file, writing at most one PDF into `output_dir`.
    ///
    /// Never fails: every fault ends up in the returned result. Scratch
    /// artifacts go to a private directory under `scratch_root` and are
    /// gone by the time this returns. The upload itself is left alone.
    pub async fn convert_file(
        &self,
        file: &UploadedFile,
        output_dir: &Path,
        scratch_root: &Path,
    ) -> ConversionResult {
        let name = file.original_filename.as_str();
        let mime = normalize_mime(&file.mime);

        let Some(class) = self.resolver.class_of(&mime) else {
            let err = Error::UnsupportedType(mime);
            warn!("Skipping '{}': {}", name, err);
            return ConversionResult::failure(name, err.to_string());
        };

        let bytes = match file.read().await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Could not read upload '{}': {}", name, e);
                return ConversionResult::failure(name, format!("could not read upload: {e}"));
            }
        };
        let scratch = match ScratchSet::new(scratch_root) {
            Ok(scratch) => scratch,
            Err(e) => {
                warn!("No scratch space for '{}': {}", name, e);
                return ConversionResult::failure(name, format!("no scratch space: {e}"));
            }
        };

        let mut job = Job::new(name, class, mime, bytes, scratch);

        for &strategy in class.strategies() {
            debug!("Trying {} for '{}'", strategy, name);
            let pdf = match self.attempt(strategy, &mut job).await {
                Ok(pdf) => pdf,
                Err(e) => {
                    warn!("{} failed for '{}': {}", strategy, name, e);
                    job.last_error = Some(e.to_string());
                    continue;
                }
            };

            let pdf_name = match write_output(pdf, output_dir, &job.stem).await {
                Ok(pdf_name) => pdf_name,
                Err(e) => {
                    warn!("Could not store PDF for '{}': {}", name, e);
                    return ConversionResult::failure(name, format!("could not store PDF: {e}"));
                }
            };

            if strategy.is_soft_failure() {
                let reason = job
                    .last_error
                    .take()
                    .unwrap_or_else(|| "document could not be converted".to_string());
                info!("'{}' failed, wrote explanatory page {}", name, pdf_name);
                return ConversionResult::soft_failure(name, pdf_name, reason);
            }
            info!("Converted '{}' with {} -> {}", name, strategy, pdf_name);
            return ConversionResult::success(name, pdf_name);
        }

        let reason = job
            .last_error
            .take()
            .unwrap_or_else(|| "no conversion strategy succeeded".to_string());
        ConversionResult::failure(name, reason)
    }

    /// Run one strategy and check that its output is a PDF with pages.
    async fn attempt(&self, strategy: Strategy, job: &mut Job) -> Result<Vec<u8>> {
        let run = self.run_strategy(strategy, job);
        let pdf = match self.strategy_timeout {
            Some(limit) if !strategy.uses_renderer() => tokio::time::timeout(limit, run)
                .await
                .map_err(|_| Error::Timeout {
                    what: "conversion strategy",
                    secs: limit.as_secs(),
                })??,
            _ => run.await?,
        };

        self.blocking(move || page_count(&pdf).map(|_| pdf)).await
    }

    /// Run CPU-bound work on the blocking pool, bounded by the worker count.
    pub(super) async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let _permit = self
            .cpu_pool
            .acquire()
            .await
            .map_err(|_| Error::RenderFault("worker pool closed".to_string()))?;
        tokio::task::spawn_blocking(f)
            .await
            .map_err(|e| Error::RenderFault(format!("worker task failed: {e}")))?
    }
}

/// Store `pdf` as `<stem>-<millis>.pdf` and return the file name.
async fn write_output(pdf: Vec<u8>, output_dir: &Path, stem: &str) -> Result<String> {
    let output_dir = output_dir.to_path_buf();
    let stem = stem.to_string();
    tokio::task::spawn_blocking(move || -> Result<String> {
        let (path, mut file) = create_unique(&output_dir, &stem, '-', "pdf")?;
        if let Err(e) = file.write_all(&pdf) {
            drop(file);
            if let Err(rm) = std::fs::remove_file(&path) {
                warn!("Failed to remove partial PDF {}: {}", path.display(), rm);
            }
            return Err(e.into());
        }
        Ok(file_name(&path))
    })
    .await
    .map_err(|e| Error::Io(std::io::Error::other(e)))?
}
