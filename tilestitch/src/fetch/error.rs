//! Error types for tile fetching.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// A request that never produced an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The connection could not be established.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The request or body read timed out.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Any other transport-level failure.
    #[error("request failed: {0}")]
    Other(String),
}

impl TransportError {
    pub fn is_connect(&self) -> bool {
        matches!(self, TransportError::Connect(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout(_))
    }
}

/// Why a single attempt at a tile did not store it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TileFailure {
    /// Non-200, non-404 status.
    #[error("HTTP {0}")]
    Status(u16),

    /// 200 with an empty body.
    #[error("empty response body")]
    EmptyBody,

    /// No response at all.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Errors fatal to the fetch of one identifier.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),

    /// A tile or specimen directory could not be created.
    #[error("failed to create directory {}: {source}", .path.display())]
    CreateDir { path: PathBuf, source: io::Error },

    /// A downloaded tile could not be persisted.
    #[error("failed to write tile {}: {source}", .path.display())]
    WriteTile { path: PathBuf, source: io::Error },

    /// The completion marker could not be written.
    #[error("failed to write completion marker {}: {source}", .path.display())]
    WriteMarker { path: PathBuf, source: io::Error },

    /// Too many tiles exhausted their attempts; remaining tiles were cancelled.
    #[error(
        "fetch of {identifier} aborted after {failed_tiles} failed tile(s); \
         last {url} after {attempts} attempt(s): {failure}"
    )]
    Aborted {
        identifier: String,
        failed_tiles: usize,
        url: String,
        attempts: u32,
        failure: TileFailure,
    },

    /// A tile task panicked or was cancelled by the runtime.
    #[error("tile task failed: {0}")]
    TaskFailed(String),
}
