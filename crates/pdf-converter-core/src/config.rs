use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

use crate::convert::FormatClass;

/// Environment variable prefix for layered configuration.
pub const ENV_PREFIX: &str = "PDF_CONVERTER";

const MIB: u64 = 1024 * 1024;

/// Submission ceilings enforced by the upload-handling layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadLimits {
    /// Maximum size of a single file in bytes
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Maximum number of files per batch
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Maximum cumulative size of a batch in bytes
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: u64,
}

const fn default_max_file_size() -> u64 {
    25 * MIB
}

const fn default_max_files() -> usize {
    20
}

const fn default_max_batch_size() -> u64 {
    100 * MIB
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            max_files: default_max_files(),
            max_batch_size: default_max_batch_size(),
        }
    }
}

/// A submission that exceeds one of the [`UploadLimits`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LimitViolation {
    #[error("too many files: {count} (limit {limit})")]
    TooManyFiles { count: usize, limit: usize },

    #[error("{name} is {size} bytes (limit {limit})")]
    FileTooLarge { name: String, size: u64, limit: u64 },

    #[error("batch is {size} bytes (limit {limit})")]
    BatchTooLarge { size: u64, limit: u64 },
}

impl UploadLimits {
    /// Check a single file against the per-file ceiling.
    pub fn check_file(&self, name: &str, size: u64) -> Result<(), LimitViolation> {
        if size > self.max_file_size {
            return Err(LimitViolation::FileTooLarge {
                name: name.to_string(),
                size,
                limit: self.max_file_size,
            });
        }
        Ok(())
    }

    /// Check a whole submission given `(name, size)` pairs.
    pub fn check<'a>(
        &self,
        files: impl IntoIterator<Item = (&'a str, u64)>,
    ) -> Result<(), LimitViolation> {
        let mut count = 0;
        let mut total: u64 = 0;
        for (name, size) in files {
            count += 1;
            if count > self.max_files {
                return Err(LimitViolation::TooManyFiles {
                    count,
                    limit: self.max_files,
                });
            }
            self.check_file(name, size)?;
            total = total.saturating_add(size);
        }
        if total > self.max_batch_size {
            return Err(LimitViolation::BatchTooLarge {
                size: total,
                limit: self.max_batch_size,
            });
        }
        Ok(())
    }
}

/// Settings for the single-file converter and its local backends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Rasterization density for SVG input
    #[serde(default = "default_svg_dpi")]
    pub svg_dpi: u32,

    /// Size of the pool for CPU-bound work (image decoding, PDF layout)
    #[serde(default = "default_cpu_workers")]
    pub cpu_workers: usize,

    /// Optional ceiling for strategies that do not use the HTML renderer
    #[serde(default)]
    pub strategy_timeout_secs: Option<u64>,
}

const fn default_svg_dpi() -> u32 {
    300
}

fn default_cpu_workers() -> usize {
    std::thread::available_parallelism().map_or(4, std::num::NonZeroUsize::get)
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            svg_dpi: default_svg_dpi(),
            cpu_workers: default_cpu_workers(),
            strategy_timeout_secs: None,
        }
    }
}

/// Headless Chrome settings for the shared HTML renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Disable to force the direct-drawing fallbacks
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Chrome/Chromium binary (auto-detected when unset)
    #[serde(default)]
    pub chrome_executable: Option<PathBuf>,

    /// Pass `--no-sandbox` (needed when running as root in containers)
    #[serde(default)]
    pub no_sandbox: bool,

    #[serde(default = "default_launch_timeout_secs")]
    pub launch_timeout_secs: u64,

    /// Ceiling for loading a document before printing
    #[serde(default = "default_navigation_timeout_secs")]
    pub navigation_timeout_secs: u64,

    /// Extra command-line switches for the browser
    #[serde(default)]
    pub extra_args: Vec<String>,
}

const fn default_true() -> bool {
    true
}

const fn default_launch_timeout_secs() -> u64 {
    20
}

const fn default_navigation_timeout_secs() -> u64 {
    30
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            chrome_executable: None,
            no_sandbox: false,
            launch_timeout_secs: default_launch_timeout_secs(),
            navigation_timeout_secs: default_navigation_timeout_secs(),
            extra_args: Vec::new(),
        }
    }
}

/// Archive naming
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Archives are named `<prefix>_<millis>.zip`
    #[serde(default = "default_archive_prefix")]
    pub prefix: String,
}

fn default_archive_prefix() -> String {
    crate::batch::DEFAULT_ARCHIVE_PREFIX.to_string()
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            prefix: default_archive_prefix(),
        }
    }
}

/// Directories used by the binaries and the sweeper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    /// How often the sweeper runs
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Files older than this are removed by the sweeper
    #[serde(default = "default_max_file_age_secs")]
    pub max_file_age_secs: u64,
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("generated")
}

fn default_scratch_dir() -> PathBuf {
    PathBuf::from("temp")
}

const fn default_sweep_interval_secs() -> u64 {
    600
}

const fn default_max_file_age_secs() -> u64 {
    600
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            output_dir: default_output_dir(),
            scratch_dir: default_scratch_dir(),
            sweep_interval_secs: default_sweep_interval_secs(),
            max_file_age_secs: default_max_file_age_secs(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub limits: UploadLimits,

    #[serde(default)]
    pub converter: ConverterConfig,

    #[serde(default)]
    pub renderer: RendererConfig,

    #[serde(default)]
    pub archive: ArchiveConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    /// Extra MIME types mapped onto a format class
    #[serde(default)]
    pub formats: BTreeMap<String, FormatClass>,
}

impl AppConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, crate::error::Error> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            crate::error::Error::ConfigLoad(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            crate::error::Error::ConfigLoad(format!("Failed to parse config: {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an optional file with `PDF_CONVERTER__SECTION__KEY`
    /// environment overrides on top.
    pub fn load_layered(path: Option<&std::path::Path>) -> Result<Self, crate::error::Error> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path.to_path_buf()).required(true));
        }
        let config: Self = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(config::Config::try_deserialize)
            .map_err(|e| crate::error::Error::ConfigLoad(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from default locations (~/.config/pdf-converter/config.toml, ./config.toml)
    pub fn load() -> Self {
        // Try user config
        if let Some(config_dir) = crate::util::config_dir() {
            let user_config = config_dir.join("pdf-converter").join("config.toml");
            if user_config.exists() {
                match Self::from_file(&user_config) {
                    Ok(config) => {
                        tracing::debug!("Loaded config from {}", user_config.display());
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // Try local config
        let local_config = std::path::PathBuf::from("config.toml");
        if local_config.exists() {
            match Self::from_file(&local_config) {
                Ok(config) => {
                    tracing::debug!("Loaded config from ./config.toml");
                    return config;
                }
                Err(e) => {
                    tracing::warn!("Failed to load ./config.toml: {}", e);
                }
            }
        }

        // Return defaults
        tracing::debug!("No config file found, using defaults");
        Self::default()
    }

    /// Reject values that would make every batch fail.
    pub fn validate(&self) -> Result<(), crate::error::Error> {
        let invalid = |field: &str, reason: &str| crate::error::Error::ConfigInvalid {
            field: field.to_string(),
            reason: reason.to_string(),
        };

        if self.limits.max_files == 0 {
            return Err(invalid("limits.max_files", "must be at least 1"));
        }
        if self.limits.max_file_size == 0 || self.limits.max_batch_size == 0 {
            return Err(invalid("limits", "size ceilings must be non-zero"));
        }
        if self.converter.svg_dpi == 0 {
            return Err(invalid("converter.svg_dpi", "must be non-zero"));
        }
        if self.converter.cpu_workers == 0 {
            return Err(invalid("converter.cpu_workers", "must be at least 1"));
        }
        if self.archive.prefix.is_empty()
            || self.archive.prefix.contains(['/', '\\'])
        {
            return Err(invalid("archive.prefix", "must be a non-empty file name"));
        }
        Ok(())
    }
}
