//! Error types for the stitch stage.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::mosaic::MosaicError;

/// Result type for stitch operations.
pub type StitchResult<T> = Result<T, StitchError>;

/// Errors fatal to a stitch run.
///
/// Reconstruction failures of single identifiers are logged and counted
/// rather than returned; only construction and manifest bookkeeping fail the
/// run.
#[derive(Debug, Error)]
pub enum StitchError {
    /// The reconstructor could not be set up.
    #[error(transparent)]
    Mosaic(#[from] MosaicError),

    /// A manifest could not be read.
    #[error("failed to read manifest {}: {source}", .path.display())]
    ManifestRead { path: PathBuf, source: csv::Error },

    /// A manifest could not be serialized.
    #[error("failed to write manifest {}: {source}", .path.display())]
    ManifestWrite { path: PathBuf, source: csv::Error },

    /// The per-specimen manifests could not be listed.
    #[error("failed to list manifests '{pattern}': {reason}")]
    ManifestScan { pattern: String, reason: String },

    /// Filesystem error on a manifest or output directory.
    #[error("I/O error on {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
}
