//! Error types for mosaic reconstruction.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for mosaic operations.
pub type MosaicResult<T> = Result<T, MosaicError>;

/// Errors fatal to the reconstruction of one identifier.
///
/// Missing and corrupt tiles are not errors; they leave zeroed regions.
#[derive(Debug, Error)]
pub enum MosaicError {
    /// The tile directory exists but could not be listed.
    #[error("failed to list tiles in {}: {source}", .path.display())]
    ListTiles { path: PathBuf, source: io::Error },

    /// The raster exceeds what the output codec can represent.
    #[error("mosaic of {width}x{height} exceeds the JPEG limit of {limit} pixels per side")]
    TooLarge { width: u64, height: u64, limit: u32 },

    /// The compute thread pool could not be built.
    #[error("failed to build thread pool: {0}")]
    ThreadPool(String),

    /// Encoding the raster failed.
    #[error("failed to encode {}: {source}", .path.display())]
    Encode {
        path: PathBuf,
        source: image::ImageError,
    },

    /// Writing the output file failed.
    #[error("failed to write {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
}
