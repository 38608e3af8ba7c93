//! Argument groups and helpers shared across CLI commands.
//!
//! Every option is optional: when given it overrides the configuration file,
//! otherwise the configured (or default) value stays in effect.

use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use tilestitch::catalog::Catalog;
use tilestitch::config::{ConfigFile, ExtentPolicy};
use tilestitch::grid::GridShape;
use tilestitch::logging::{init_logging, LoggingGuard};
use tracing::warn;

use crate::error::CliError;

/// Row-count rule for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum GridShapeArg {
    /// Rows from the image height
    Independent,
    /// As many rows as columns (legacy downloads)
    Square,
}

impl From<GridShapeArg> for GridShape {
    fn from(arg: GridShapeArg) -> Self {
        match arg {
            GridShapeArg::Independent => GridShape::Independent,
            GridShapeArg::Square => GridShape::Square,
        }
    }
}

/// Mosaic extent for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum ExtentArg {
    /// Size the mosaic from the tiles found on disk
    Tiles,
    /// Size the mosaic from the catalog grid
    Declared,
}

impl From<ExtentArg> for ExtentPolicy {
    fn from(arg: ExtentArg) -> Self {
        match arg {
            ExtentArg::Tiles => ExtentPolicy::InferFromTiles,
            ExtentArg::Declared => ExtentPolicy::Declared,
        }
    }
}

/// Catalog and storage options used by every pipeline command.
#[derive(Debug, Clone, Default, Args)]
pub struct CommonArgs {
    /// Catalog CSV file, or a glob such as 'identifiers/*_identifiers.csv'
    #[arg(long)]
    pub catalog: Option<String>,

    /// Directory holding downloaded tiles
    #[arg(long)]
    pub tile_root: Option<PathBuf>,

    /// Directory receiving mosaics and manifests
    #[arg(long)]
    pub output_root: Option<PathBuf>,

    /// How the number of tile rows is computed
    #[arg(long, value_enum)]
    pub grid: Option<GridShapeArg>,
}

impl CommonArgs {
    pub fn apply(&self, config: &mut ConfigFile) {
        if let Some(catalog) = &self.catalog {
            config.paths.catalog = Some(catalog.clone());
        }
        if let Some(root) = &self.tile_root {
            config.paths.tile_root = root.clone();
        }
        if let Some(root) = &self.output_root {
            config.paths.output_root = root.clone();
        }
        if let Some(shape) = self.grid {
            config.grid.shape = shape.into();
        }
    }
}

/// Download tuning.
#[derive(Debug, Clone, Default, Args)]
pub struct FetchOptions {
    /// Base URL of the tile server
    #[arg(long)]
    pub base_url: Option<String>,

    /// Maximum concurrent tile requests
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Attempts per tile before giving up
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Seconds to wait after a connection failure
    #[arg(long)]
    pub retry_backoff: Option<u64>,

    /// Failed tiles tolerated per identifier (0 aborts on the first)
    #[arg(long)]
    pub max_failed_tiles: Option<usize>,
}

impl FetchOptions {
    pub fn apply(&self, config: &mut ConfigFile) {
        if let Some(url) = &self.base_url {
            config.remote.base_url = url.clone();
        }
        if let Some(n) = self.concurrency {
            config.fetch.max_concurrency = n;
        }
        if let Some(n) = self.max_attempts {
            config.fetch.max_attempts = n;
        }
        if let Some(secs) = self.retry_backoff {
            config.fetch.retry_backoff_secs = secs;
        }
        if let Some(n) = self.max_failed_tiles {
            config.fetch.max_failed_tiles = n;
        }
    }
}

/// Reconstruction tuning.
#[derive(Debug, Clone, Default, Args)]
pub struct StitchOptions {
    /// How the mosaic size is determined
    #[arg(long, value_enum)]
    pub extent: Option<ExtentArg>,

    /// Revisit specimens whose manifest exists; existing mosaics are kept
    #[arg(long)]
    pub clobber: bool,

    /// Decode threads (0 = one per core)
    #[arg(long)]
    pub threads: Option<usize>,

    /// JPEG quality of the written mosaics (1-100)
    #[arg(long)]
    pub quality: Option<u8>,
}

impl StitchOptions {
    pub fn apply(&self, config: &mut ConfigFile) {
        if let Some(extent) = self.extent {
            config.stitch.extent = extent.into();
        }
        if self.clobber {
            config.stitch.clobber = true;
        }
        if let Some(n) = self.threads {
            config.stitch.threads = n;
        }
        if let Some(q) = self.quality {
            config.stitch.jpeg_quality = q;
        }
    }
}

/// Load the configuration file, from `path` when given.
pub fn load_config(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    let config = match path {
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };
    Ok(config)
}

/// Load the catalog named by the effective configuration.
///
/// A source containing glob metacharacters is expanded; anything else is
/// read as a single file.
pub fn resolve_catalog(config: &ConfigFile) -> Result<Catalog, CliError> {
    let source = config.paths.catalog.as_deref().ok_or_else(|| {
        CliError::Config(
            "No catalog given. Use --catalog or set catalog under [paths] in config.ini"
                .to_string(),
        )
    })?;

    let catalog = if is_glob(source) {
        Catalog::from_glob(source)?
    } else {
        Catalog::from_path(Path::new(source))?
    };

    if !catalog.skipped().is_empty() {
        warn!(
            skipped = catalog.skipped().len(),
            loaded = catalog.len(),
            "Catalog rows skipped; see the warnings above"
        );
    }
    if catalog.is_empty() {
        return Err(CliError::Config(format!(
            "Catalog '{}' contains no usable records",
            source
        )));
    }
    Ok(catalog)
}

fn is_glob(source: &str) -> bool {
    source.contains(['*', '?', '['])
}

/// Start file and stdout logging as configured.
pub fn start_logging(config: &ConfigFile, verbose: bool) -> Result<LoggingGuard, CliError> {
    let level = if verbose { "debug" } else { "info" };
    init_logging(&config.logging.directory, &config.logging.file, level)
        .map_err(|e| CliError::LoggingInit(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = "identifier,sub,width,height,tierCount,cropTop,cropLeft\n\
                           0001,a,300,260,1,0,0\n";

    #[test]
    fn test_cli_overrides_config() {
        let mut config = ConfigFile::default();
        CommonArgs {
            catalog: Some("ids.csv".to_string()),
            tile_root: Some(PathBuf::from("/data/tiles")),
            output_root: None,
            grid: Some(GridShapeArg::Square),
        }
        .apply(&mut config);
        FetchOptions {
            concurrency: Some(8),
            ..Default::default()
        }
        .apply(&mut config);
        StitchOptions {
            extent: Some(ExtentArg::Declared),
            clobber: true,
            ..Default::default()
        }
        .apply(&mut config);

        assert_eq!(config.paths.catalog.as_deref(), Some("ids.csv"));
        assert_eq!(config.paths.tile_root, PathBuf::from("/data/tiles"));
        assert_eq!(config.paths.output_root, ConfigFile::default().paths.output_root);
        assert_eq!(config.grid.shape, GridShape::Square);
        assert_eq!(config.fetch.max_concurrency, 8);
        assert_eq!(config.fetch.max_attempts, ConfigFile::default().fetch.max_attempts);
        assert_eq!(config.stitch.extent, ExtentPolicy::Declared);
        assert!(config.stitch.clobber);
    }

    #[test]
    fn test_absent_clobber_keeps_config() {
        let mut config = ConfigFile::default();
        config.stitch.clobber = true;
        StitchOptions::default().apply(&mut config);
        assert!(config.stitch.clobber);
    }

    #[test]
    fn test_resolve_catalog_file_and_glob() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sub-a_identifiers.csv"), CATALOG).unwrap();

        let mut config = ConfigFile::default();
        config.paths.catalog = Some(
            dir.path()
                .join("sub-a_identifiers.csv")
                .to_string_lossy()
                .into_owned(),
        );
        assert_eq!(resolve_catalog(&config).unwrap().len(), 1);

        config.paths.catalog = Some(format!("{}/*_identifiers.csv", dir.path().display()));
        assert_eq!(resolve_catalog(&config).unwrap().len(), 1);
    }

    #[test]
    fn test_gap_rows_do_not_block_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub-a_identifiers.csv");
        std::fs::write(&path, format!("{}0002,a,,10,1,0,0\n", CATALOG)).unwrap();

        let mut config = ConfigFile::default();
        config.paths.catalog = Some(path.to_string_lossy().into_owned());
        let catalog = resolve_catalog(&config).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.skipped().len(), 1);
    }

    #[test]
    fn test_missing_catalog_is_config_error() {
        let config = ConfigFile::default();
        assert!(matches!(resolve_catalog(&config), Err(CliError::Config(_))));
    }

    #[test]
    fn test_glob_detection() {
        assert!(is_glob("identifiers/*_identifiers.csv"));
        assert!(is_glob("sub-71464?.csv"));
        assert!(!is_glob("identifiers/sub-714645_identifiers.csv"));
    }
}
