//! A single catalog row.

use serde::{Deserialize, Serialize};

use super::lenient;
use crate::grid::{GridShape, TileAddress, TileGrid};

/// Metadata for one image of the pyramid, as produced by the metadata
/// extraction step.
///
/// Field names follow the catalog header; the aliases accept the column
/// names written by the identifier extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Image identifier. Kept as text: identifiers may be zero-padded.
    pub identifier: String,

    /// Specimen the image belongs to.
    pub sub: String,

    #[serde(deserialize_with = "lenient::whole")]
    pub width: u32,

    #[serde(deserialize_with = "lenient::whole")]
    pub height: u32,

    #[serde(
        rename = "tierCount",
        alias = "tier_count",
        deserialize_with = "lenient::whole"
    )]
    pub tier_count: u32,

    #[serde(
        rename = "cropTop",
        alias = "siTop",
        alias = "crop_top",
        deserialize_with = "lenient::whole"
    )]
    pub crop_top: u32,

    #[serde(
        rename = "cropLeft",
        alias = "siLeft",
        alias = "crop_left",
        deserialize_with = "lenient::whole"
    )]
    pub crop_left: u32,

    #[serde(rename = "remotePath", alias = "remote_path", default)]
    pub remote_path: Option<String>,

    #[serde(
        rename = "structureId",
        alias = "structure_id",
        default,
        deserialize_with = "lenient::optional_whole"
    )]
    pub structure_id: Option<i64>,

    #[serde(default)]
    pub resolution: Option<f64>,

    #[serde(
        rename = "sampleIndex",
        alias = "sample",
        alias = "sample_index",
        default,
        deserialize_with = "lenient::optional_whole"
    )]
    pub sample_index: Option<u32>,
}

impl ImageRecord {
    /// Creates a record with only the required fields set.
    pub fn new(
        identifier: impl Into<String>,
        sub: impl Into<String>,
        width: u32,
        height: u32,
        tier_count: u32,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            sub: sub.into(),
            width,
            height,
            tier_count,
            crop_top: 0,
            crop_left: 0,
            remote_path: None,
            structure_id: None,
            resolution: None,
            sample_index: None,
        }
    }

    pub fn with_crop(mut self, crop_top: u32, crop_left: u32) -> Self {
        self.crop_top = crop_top;
        self.crop_left = crop_left;
        self
    }

    pub fn with_remote_path(mut self, remote_path: impl Into<String>) -> Self {
        self.remote_path = Some(remote_path.into());
        self
    }

    pub fn with_sample_index(mut self, sample_index: u32) -> Self {
        self.sample_index = Some(sample_index);
        self
    }

    /// The finest zoom tier of this image's pyramid.
    pub fn zoom(&self) -> u32 {
        self.tier_count.saturating_sub(1)
    }

    /// Path of the pyramid below the service base URL.
    ///
    /// Falls back to `{identifier}/{identifier}.aff` when the catalog leaves
    /// it empty.
    pub fn remote_path(&self) -> String {
        match self.remote_path.as_deref().map(str::trim) {
            Some(path) if !path.is_empty() => path.trim_matches('/').to_string(),
            _ => format!("{0}/{0}.aff", self.identifier),
        }
    }

    pub fn grid(&self, shape: GridShape) -> TileGrid {
        TileGrid::for_image(self.width, self.height, self.tier_count, shape)
    }

    pub fn tile_address(&self, base_url: &str) -> TileAddress {
        TileAddress {
            base_url: base_url.to_string(),
            remote_path: self.remote_path(),
            crop_top: self.crop_top,
            crop_left: self.crop_left,
            width: self.width,
            height: self.height,
        }
    }

    /// Checks the invariants `width > 0`, `height > 0`, `tier_count >= 1`.
    pub fn validate(&self) -> Result<(), String> {
        if self.identifier.trim().is_empty() {
            return Err("identifier is empty".to_string());
        }
        if self.width == 0 {
            return Err("width must be positive".to_string());
        }
        if self.height == 0 {
            return Err("height must be positive".to_string());
        }
        if self.tier_count == 0 {
            return Err("tier count must be at least 1".to_string());
        }
        Ok(())
    }
}
