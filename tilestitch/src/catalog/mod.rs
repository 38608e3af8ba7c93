//! Image catalog input.
//!
//! The catalog is a CSV table with one row per image, produced upstream by
//! the metadata extraction step (typically one file per specimen, named
//! `{specimen}_identifiers.csv`). This module loads one or many such files and
//! groups their rows by specimen.
//!
//! A file missing a required column is rejected. A row with an empty or
//! malformed required field is skipped with a warning and kept in
//! [`Catalog::skipped`]; the rest of the batch still runs.
//!
//! # Example
//!
//! ```ignore
//! use tilestitch::catalog::Catalog;
//!
//! let catalog = Catalog::from_glob("identifiers/*_identifiers.csv")?;
//! for (sub, records) in catalog.by_specimen() {
//!     println!("{}: {} images", sub, records.len());
//! }
//! ```

mod error;
mod lenient;
mod record;

pub use error::{CatalogError, CatalogResult, SkippedRow};
pub use record::ImageRecord;

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

/// Required columns, each with the header names accepted for it.
const REQUIRED_COLUMNS: &[&[&str]] = &[
    &["identifier"],
    &["sub"],
    &["width"],
    &["height"],
    &["tierCount", "tier_count"],
    &["cropTop", "siTop", "crop_top"],
    &["cropLeft", "siLeft", "crop_left"],
];

/// All image records of a batch run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    records: Vec<ImageRecord>,
    skipped: Vec<SkippedRow>,
}

impl Catalog {
    /// Creates a catalog from already-validated records.
    pub fn new(records: Vec<ImageRecord>) -> Self {
        Self {
            records,
            skipped: Vec::new(),
        }
    }

    /// Reads a catalog from any CSV source with a header row.
    ///
    /// `source` names the input in log messages and errors.
    pub fn from_reader<R: Read>(reader: R, source: &str) -> CatalogResult<Self> {
        let parse_err = |line: usize, e: csv::Error| CatalogError::Parse {
            source_name: source.to_string(),
            line,
            reason: e.to_string(),
        };

        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);
        let headers = csv_reader.headers().map_err(|e| parse_err(1, e))?.clone();
        check_columns(&headers, source)?;
        let id_column = headers.iter().position(|h| h == "identifier");

        let mut catalog = Catalog::default();
        for (index, row) in csv_reader.records().enumerate() {
            // Row 1 is the header.
            let line = index + 2;
            let row = match row {
                Ok(row) => row,
                Err(e) if e.is_io_error() => return Err(parse_err(line, e)),
                Err(e) => {
                    catalog.skip(source, line, None, e.to_string());
                    continue;
                }
            };
            let identifier = id_column
                .and_then(|i| row.get(i))
                .filter(|id| !id.is_empty())
                .map(str::to_string);

            let record = match row.deserialize::<ImageRecord>(Some(&headers)) {
                Ok(record) => record,
                Err(e) => {
                    catalog.skip(source, line, identifier, e.to_string());
                    continue;
                }
            };
            if let Err(reason) = record.validate() {
                catalog.skip(source, line, identifier, reason);
                continue;
            }
            catalog.records.push(record);
        }

        debug!(
            source,
            rows = catalog.records.len(),
            skipped = catalog.skipped.len(),
            "Catalog parsed"
        );
        Ok(catalog)
    }

    fn skip(&mut self, source: &str, line: usize, identifier: Option<String>, reason: String) {
        let row = SkippedRow {
            source_name: source.to_string(),
            line,
            identifier,
            reason,
        };
        warn!("{}", row);
        self.skipped.push(row);
    }

    /// Reads a catalog file.
    pub fn from_path(path: &Path) -> CatalogResult<Self> {
        let file = File::open(path).map_err(|e| CatalogError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_reader(file, &path.display().to_string())
    }

    /// Reads and merges several catalog files, in the given order.
    pub fn from_paths<P: AsRef<Path>>(paths: &[P]) -> CatalogResult<Self> {
        let mut catalog = Catalog::default();
        for path in paths {
            catalog.extend(Self::from_path(path.as_ref())?);
        }
        Ok(catalog)
    }

    /// Reads and merges every file matching a glob pattern, sorted by path.
    pub fn from_glob(pattern: &str) -> CatalogResult<Self> {
        let entries = glob::glob(pattern).map_err(|e| CatalogError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        let mut paths: Vec<PathBuf> = entries.filter_map(Result::ok).collect();
        if paths.is_empty() {
            return Err(CatalogError::NoFilesMatched(pattern.to_string()));
        }
        paths.sort();

        let catalog = Self::from_paths(&paths)?;
        info!(
            pattern,
            files = paths.len(),
            records = catalog.len(),
            skipped = catalog.skipped.len(),
            "Loaded catalog files"
        );
        Ok(catalog)
    }

    /// Appends the records of another catalog.
    pub fn extend(&mut self, other: Catalog) {
        self.records.extend(other.records);
        self.skipped.extend(other.skipped);
    }

    /// Keeps only the records for which `keep` returns true.
    pub fn retain(&mut self, keep: impl FnMut(&ImageRecord) -> bool) {
        self.records.retain(keep);
    }

    pub fn records(&self) -> &[ImageRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rows left out while loading, in file order.
    pub fn skipped(&self) -> &[SkippedRow] {
        &self.skipped
    }

    /// Groups records by specimen, specimens in sorted order and records in
    /// catalog order.
    pub fn by_specimen(&self) -> BTreeMap<&str, Vec<&ImageRecord>> {
        let mut groups: BTreeMap<&str, Vec<&ImageRecord>> = BTreeMap::new();
        for record in &self.records {
            groups.entry(record.sub.as_str()).or_default().push(record);
        }
        groups
    }
}

fn check_columns(headers: &csv::StringRecord, source: &str) -> CatalogResult<()> {
    for names in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| names.contains(&h)) {
            return Err(CatalogError::MissingColumn {
                source_name: source.to_string(),
                column: names[0].to_string(),
            });
        }
    }
    Ok(())
}
