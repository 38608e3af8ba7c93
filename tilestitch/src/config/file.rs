//! INI configuration file.
//!
//! Default location: `{config_dir}/tilestitch/config.ini`. A missing file
//! yields the defaults below; present keys override them.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use super::{ExtentPolicy, FetchConfig, StitchConfig};
use crate::fetch::EscalationPolicy;
use crate::grid::GridShape;
use crate::layout::StorageLayout;

/// Base URL of the image pyramid service.
pub const DEFAULT_BASE_URL: &str =
    "http://www.blueprintnhpatlas.org/imageservice/imagepyramid/info///external/nhp/prod23/";

/// Per-request HTTP timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum in-flight tile requests per identifier.
pub const DEFAULT_MAX_CONCURRENCY: usize = 300;

/// Attempts per tile before it counts as failed.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Fixed sleep after a connection-level failure, in seconds.
pub const DEFAULT_RETRY_BACKOFF_SECS: u64 = 60;

/// Exhausted tiles tolerated per identifier before the fetch is aborted.
pub const DEFAULT_MAX_FAILED_TILES: usize = 0;

/// Identifiers between progress log lines.
pub const DEFAULT_PROGRESS_INTERVAL: usize = 10;

/// JPEG quality of written mosaics.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

pub const DEFAULT_TILE_ROOT: &str = "tiles";
pub const DEFAULT_OUTPUT_ROOT: &str = "images";
pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_LOG_FILE: &str = "tilestitch.log";

/// Errors from loading or saving the configuration file.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read or parse the INI file.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write the INI file.
    #[error("Failed to write config file {}: {source}", .path.display())]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A key holds a value that cannot be used.
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

/// `[remote]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteSettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

/// `[fetch]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchSettings {
    pub max_concurrency: usize,
    pub max_attempts: u32,
    pub retry_backoff_secs: u64,
    pub max_failed_tiles: usize,
    pub progress_interval: usize,
}

/// `[grid]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct GridSettings {
    pub shape: GridShape,
}

/// `[stitch]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct StitchSettings {
    pub extent: ExtentPolicy,
    pub clobber: bool,
    /// Compute threads; 0 uses every available core.
    pub threads: usize,
    pub jpeg_quality: u8,
}

/// `[paths]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct PathSettings {
    pub tile_root: PathBuf,
    pub output_root: PathBuf,
    /// Catalog file or glob pattern.
    pub catalog: Option<String>,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub directory: PathBuf,
    pub file: String,
}

/// Parsed configuration file.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub remote: RemoteSettings,
    pub fetch: FetchSettings,
    pub grid: GridSettings,
    pub stitch: StitchSettings,
    pub paths: PathSettings,
    pub logging: LoggingSettings,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            remote: RemoteSettings {
                base_url: DEFAULT_BASE_URL.to_string(),
                timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            },
            fetch: FetchSettings {
                max_concurrency: DEFAULT_MAX_CONCURRENCY,
                max_attempts: DEFAULT_MAX_ATTEMPTS,
                retry_backoff_secs: DEFAULT_RETRY_BACKOFF_SECS,
                max_failed_tiles: DEFAULT_MAX_FAILED_TILES,
                progress_interval: DEFAULT_PROGRESS_INTERVAL,
            },
            grid: GridSettings {
                shape: GridShape::default(),
            },
            stitch: StitchSettings {
                extent: ExtentPolicy::default(),
                clobber: false,
                threads: 0,
                jpeg_quality: DEFAULT_JPEG_QUALITY,
            },
            paths: PathSettings {
                tile_root: PathBuf::from(DEFAULT_TILE_ROOT),
                output_root: PathBuf::from(DEFAULT_OUTPUT_ROOT),
                catalog: None,
            },
            logging: LoggingSettings {
                directory: PathBuf::from(DEFAULT_LOG_DIR),
                file: DEFAULT_LOG_FILE.to_string(),
            },
        }
    }
}

impl ConfigFile {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Parse configuration from INI text.
    pub fn from_ini_str(content: &str) -> Result<Self, ConfigFileError> {
        let ini = Ini::load_from_str(content).map_err(ini::Error::Parse)?;
        super::parser::parse_ini(&ini)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigFileError::WriteError {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path, self.to_config_string()).map_err(|e| ConfigFileError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Commented INI representation of the effective configuration.
    pub fn to_config_string(&self) -> String {
        super::writer::to_config_string(self)
    }

    /// Storage layout for the configured roots.
    pub fn layout(&self) -> StorageLayout {
        StorageLayout::new(&self.paths.tile_root, &self.paths.output_root)
    }

    /// Builds the fetch configuration.
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig::new()
            .with_base_url(&self.remote.base_url)
            .with_request_timeout(Duration::from_secs(self.remote.timeout_secs))
            .with_max_concurrency(self.fetch.max_concurrency)
            .with_max_attempts(self.fetch.max_attempts)
            .with_retry_backoff(Duration::from_secs(self.fetch.retry_backoff_secs))
            .with_escalation(EscalationPolicy::from_threshold(
                self.fetch.max_failed_tiles,
            ))
            .with_progress_interval(self.fetch.progress_interval)
            .with_grid_shape(self.grid.shape)
    }

    /// Builds the stitch configuration.
    pub fn stitch_config(&self) -> StitchConfig {
        StitchConfig::new()
            .with_extent_policy(self.stitch.extent)
            .with_grid_shape(self.grid.shape)
            .with_clobber(self.stitch.clobber)
            .with_threads(self.stitch.threads)
            .with_jpeg_quality(self.stitch.jpeg_quality)
    }
}

/// Directory holding the configuration file.
pub fn config_directory() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tilestitch")
}

/// Default configuration file path.
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}
