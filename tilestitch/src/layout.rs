//! On-disk layout of tiles, completion markers, mosaics and manifests.
//!
//! ```text
//! {tile_root}/
//! └── sub-{sub}/
//!     ├── {identifier}.txt          completion marker
//!     └── {identifier}/
//!         └── {zoom}-{x}-{y}.jpg    tiles
//!
//! {output_root}/
//! ├── stitched_images.csv           global manifest
//! ├── sub-{sub}_stitched_images.csv per-specimen manifest
//! └── sub-{sub}/
//!     └── sub-{sub}_{identifier}_{sample}.jpg
//! ```

use std::path::{Path, PathBuf};

use crate::catalog::ImageRecord;

/// File name of the global manifest.
pub const GLOBAL_MANIFEST_NAME: &str = "stitched_images.csv";

/// Resolves every path the pipeline reads or writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    tile_root: PathBuf,
    output_root: PathBuf,
}

impl StorageLayout {
    pub fn new(tile_root: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            tile_root: tile_root.into(),
            output_root: output_root.into(),
        }
    }

    pub fn tile_root(&self) -> &Path {
        &self.tile_root
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// `{tile_root}/sub-{sub}`
    pub fn specimen_tile_dir(&self, sub: &str) -> PathBuf {
        self.tile_root.join(specimen_dir_name(sub))
    }

    /// `{tile_root}/sub-{sub}/{identifier}`
    pub fn image_tile_dir(&self, record: &ImageRecord) -> PathBuf {
        self.specimen_tile_dir(&record.sub).join(&record.identifier)
    }

    /// `{tile_root}/sub-{sub}/{identifier}.txt`
    pub fn marker_path(&self, record: &ImageRecord) -> PathBuf {
        self.specimen_tile_dir(&record.sub)
            .join(format!("{}.txt", record.identifier))
    }

    /// `{output_root}/sub-{sub}`
    pub fn specimen_output_dir(&self, sub: &str) -> PathBuf {
        self.output_root.join(specimen_dir_name(sub))
    }

    /// `{output_root}/sub-{sub}/sub-{sub}_{identifier}[_{sample}].jpg`
    pub fn mosaic_path(&self, record: &ImageRecord) -> PathBuf {
        let stem = match record.sample_index {
            Some(sample) => format!(
                "{}_{}_{}",
                specimen_dir_name(&record.sub),
                record.identifier,
                sample
            ),
            None => format!("{}_{}", specimen_dir_name(&record.sub), record.identifier),
        };
        self.specimen_output_dir(&record.sub)
            .join(format!("{}.jpg", stem))
    }

    /// `{output_root}/sub-{sub}_stitched_images.csv`
    pub fn specimen_manifest_path(&self, sub: &str) -> PathBuf {
        self.output_root.join(format!(
            "{}_{}",
            specimen_dir_name(sub),
            GLOBAL_MANIFEST_NAME
        ))
    }

    /// Glob matching every per-specimen manifest under the output root.
    pub fn specimen_manifest_pattern(&self) -> String {
        let root = glob::Pattern::escape(&self.output_root.to_string_lossy());
        format!("{}/sub-*_{}", root, GLOBAL_MANIFEST_NAME)
    }

    /// `{output_root}/stitched_images.csv`
    pub fn global_manifest_path(&self) -> PathBuf {
        self.output_root.join(GLOBAL_MANIFEST_NAME)
    }
}

fn specimen_dir_name(sub: &str) -> String {
    format!("sub-{}", sub)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> StorageLayout {
        StorageLayout::new("/data/tiles", "/data/images")
    }

    #[test]
    fn test_tile_paths() {
        let record = ImageRecord::new("0001", "714645", 300, 260, 1);
        assert_eq!(
            layout().image_tile_dir(&record),
            PathBuf::from("/data/tiles/sub-714645/0001")
        );
        assert_eq!(
            layout().marker_path(&record),
            PathBuf::from("/data/tiles/sub-714645/0001.txt")
        );
    }

    #[test]
    fn test_mosaic_path_with_and_without_sample() {
        let record = ImageRecord::new("0001", "714645", 300, 260, 1);
        assert_eq!(
            layout().mosaic_path(&record),
            PathBuf::from("/data/images/sub-714645/sub-714645_0001.jpg")
        );

        let sampled = record.with_sample_index(42);
        assert_eq!(
            layout().mosaic_path(&sampled),
            PathBuf::from("/data/images/sub-714645/sub-714645_0001_42.jpg")
        );
    }

    #[test]
    fn test_manifest_paths() {
        assert_eq!(
            layout().specimen_manifest_path("714645"),
            PathBuf::from("/data/images/sub-714645_stitched_images.csv")
        );
        assert_eq!(
            layout().global_manifest_path(),
            PathBuf::from("/data/images/stitched_images.csv")
        );
    }

    #[test]
    fn test_specimen_manifest_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path().join("t"), dir.path().join("out [1]"));
        std::fs::create_dir_all(layout.output_root()).unwrap();
        for path in [
            layout.specimen_manifest_path("a"),
            layout.specimen_manifest_path("b"),
            layout.global_manifest_path(),
            layout.output_root().join("sub-c_stitched_images.csv.part"),
        ] {
            std::fs::write(path, "").unwrap();
        }

        let mut found: Vec<PathBuf> = glob::glob(&layout.specimen_manifest_pattern())
            .unwrap()
            .filter_map(Result::ok)
            .collect();
        found.sort();
        assert_eq!(
            found,
            vec![
                layout.specimen_manifest_path("a"),
                layout.specimen_manifest_path("b")
            ]
        );
    }
}
