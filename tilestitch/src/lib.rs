//! tilestitch - tiled image pyramid download and mosaic reconstruction
//!
//! Fetches the finest tier of remote image pyramids tile by tile and stitches
//! each image's tiles back into one full-resolution greyscale mosaic.
//!
//! The pipeline runs in two resumable stages over a CSV catalog:
//!
//! 1. [`fetch`]: download every missing tile with bounded concurrency and
//!    retry, then write a completion marker per image
//! 2. [`stitch`]: reconstruct each image from the tiles on disk and record
//!    the results in per-specimen and global manifests
//!
//! ```ignore
//! use std::sync::Arc;
//! use tilestitch::catalog::Catalog;
//! use tilestitch::config::ConfigFile;
//! use tilestitch::fetch::{FetchCoordinator, ReqwestTileClient};
//! use tilestitch::stitch::StitchCoordinator;
//!
//! let config = ConfigFile::load()?;
//! let catalog = Catalog::from_glob("identifiers/*_identifiers.csv")?;
//! let fetch = config.fetch_config();
//! let client = Arc::new(ReqwestTileClient::new(fetch.request_timeout())?);
//!
//! FetchCoordinator::new(client, config.layout(), fetch).run(&catalog).await;
//! StitchCoordinator::new(config.layout(), config.stitch_config())?.run(&catalog)?;
//! ```

pub mod catalog;
pub mod config;
pub mod fetch;
pub mod grid;
pub mod layout;
pub mod logging;
pub mod mosaic;
pub mod stitch;

#[cfg(test)]
pub(crate) mod testing;

/// Version of the tilestitch library and CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
