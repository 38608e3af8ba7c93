//! Error types for catalog loading.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors that can occur while loading the image catalog.
///
/// Only problems with a whole file are errors. A bad row is recorded as a
/// [`SkippedRow`] and loading continues.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog file could not be opened.
    #[error("failed to read catalog {}: {source}", .path.display())]
    ReadFailed { path: PathBuf, source: io::Error },

    /// The file could not be read as CSV.
    #[error("{source_name}:{line}: {reason}")]
    Parse {
        source_name: String,
        line: usize,
        reason: String,
    },

    /// The header lacks a required column under any accepted name.
    #[error("{source_name}: missing required column '{column}'")]
    MissingColumn { source_name: String, column: String },

    /// The glob pattern is malformed.
    #[error("invalid catalog pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// The glob pattern matched nothing.
    #[error("no catalog files match '{0}'")]
    NoFilesMatched(String),
}

/// A catalog row left out of the batch because a required field is empty,
/// malformed or out of range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    pub source_name: String,
    pub line: usize,
    /// Identifier of the row, when that column could be read.
    pub identifier: Option<String>,
    pub reason: String,
}

impl fmt::Display for SkippedRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.identifier {
            Some(id) => write!(
                f,
                "{}:{}: skipped {}: {}",
                self.source_name, self.line, id, self.reason
            ),
            None => write!(f, "{}:{}: skipped: {}", self.source_name, self.line, self.reason),
        }
    }
}
