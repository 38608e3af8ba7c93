//! Manifest tables.
//!
//! A manifest row is the catalog row of a stitched identifier plus the path
//! of its mosaic. Per-specimen manifests are written after each specimen;
//! the global manifest is their union, deduplicated by identifier.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::{StitchError, StitchResult};
use crate::catalog::ImageRecord;

/// One stitched identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestRow {
    pub identifier: String,
    pub sub: String,
    pub width: u32,
    pub height: u32,
    #[serde(rename = "tierCount")]
    pub tier_count: u32,
    #[serde(rename = "cropTop")]
    pub crop_top: u32,
    #[serde(rename = "cropLeft")]
    pub crop_left: u32,
    #[serde(rename = "remotePath")]
    pub remote_path: String,
    #[serde(rename = "structureId")]
    pub structure_id: Option<i64>,
    pub resolution: Option<f64>,
    #[serde(rename = "sampleIndex")]
    pub sample_index: Option<u32>,
    #[serde(rename = "mosaicPath")]
    pub mosaic_path: PathBuf,
}

impl ManifestRow {
    pub fn from_record(record: &ImageRecord, mosaic_path: impl Into<PathBuf>) -> Self {
        Self {
            identifier: record.identifier.clone(),
            sub: record.sub.clone(),
            width: record.width,
            height: record.height,
            tier_count: record.tier_count,
            crop_top: record.crop_top,
            crop_left: record.crop_left,
            remote_path: record.remote_path(),
            structure_id: record.structure_id,
            resolution: record.resolution,
            sample_index: record.sample_index,
            mosaic_path: mosaic_path.into(),
        }
    }
}

/// Reads a manifest written by [`write_manifest`].
pub fn read_manifest(path: &Path) -> StitchResult<Vec<ManifestRow>> {
    let read_err = |source| StitchError::ManifestRead {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::Reader::from_path(path).map_err(read_err)?;
    reader
        .deserialize()
        .collect::<Result<Vec<ManifestRow>, _>>()
        .map_err(read_err)
}

/// Writes a manifest via a `.part` sibling and rename.
pub fn write_manifest(path: &Path, rows: &[ManifestRow]) -> StitchResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StitchError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let mut temp = path.as_os_str().to_os_string();
    temp.push(".part");
    let temp = PathBuf::from(temp);

    let write_err = |source| StitchError::ManifestWrite {
        path: path.to_path_buf(),
        source,
    };

    // An empty table still gets its header row.
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(&temp)
        .map_err(write_err)?;
    writer.write_record(HEADER).map_err(write_err)?;
    for row in rows {
        writer.serialize(row).map_err(write_err)?;
    }
    writer.flush().map_err(|e| StitchError::Io {
        path: temp.clone(),
        source: e,
    })?;
    drop(writer);

    std::fs::rename(&temp, path).map_err(|e| StitchError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

const HEADER: [&str; 12] = [
    "identifier",
    "sub",
    "width",
    "height",
    "tierCount",
    "cropTop",
    "cropLeft",
    "remotePath",
    "structureId",
    "resolution",
    "sampleIndex",
    "mosaicPath",
];

/// Concatenates tables, keeping the first row seen for each identifier.
pub fn merge_manifests<I>(tables: I) -> Vec<ManifestRow>
where
    I: IntoIterator<Item = Vec<ManifestRow>>,
{
    let mut seen = HashSet::new();
    tables
        .into_iter()
        .flatten()
        .filter(|row| seen.insert(row.identifier.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(identifier: &str, sub: &str) -> ManifestRow {
        let record = ImageRecord::new(identifier, sub, 300, 260, 1).with_sample_index(4);
        ManifestRow::from_record(&record, format!("/out/sub-{sub}/sub-{sub}_{identifier}_4.jpg"))
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub-a_stitched_images.csv");
        let rows = vec![row("0001", "a"), row("0002", "a")];

        write_manifest(&path, &rows).unwrap();
        assert_eq!(read_manifest(&path).unwrap(), rows);
        assert!(!dir.path().join("sub-a_stitched_images.csv.part").exists());
    }

    #[test]
    fn test_header_matches_catalog_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.csv");
        write_manifest(&path, &[row("0001", "a")]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(
            header,
            "identifier,sub,width,height,tierCount,cropTop,cropLeft,remotePath,\
             structureId,resolution,sampleIndex,mosaicPath"
        );
        assert!(text.contains("0001,a,300,260,1,0,0,0001/0001.aff,,,4,"));
    }

    #[test]
    fn test_empty_manifest_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.csv");
        write_manifest(&path, &[]).unwrap();

        assert!(read_manifest(&path).unwrap().is_empty());
        assert!(std::fs::read_to_string(&path).unwrap().starts_with("identifier,"));
    }

    #[test]
    fn test_merge_dedupes_by_identifier() {
        let merged = merge_manifests(vec![
            vec![row("0001", "a"), row("0002", "a")],
            vec![row("0002", "b"), row("0003", "b")],
        ]);

        let ids: Vec<&str> = merged.iter().map(|r| r.identifier.as_str()).collect();
        assert_eq!(ids, vec!["0001", "0002", "0003"]);
        assert_eq!(merged[1].sub, "a");
    }
}
