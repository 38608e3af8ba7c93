//! Mosaic stitching configuration.

use std::fmt;
use std::str::FromStr;

use super::file::DEFAULT_JPEG_QUALITY;
use crate::grid::GridShape;

/// How the mosaic canvas size is chosen.
///
/// Parsed from the `extent` key of `[stitch]` and passed unchanged to the
/// reconstructor, which reads the declared size from the catalog grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ExtentPolicy {
    /// Span of the tiles actually present on disk.
    #[default]
    InferFromTiles,
    /// The catalog's tile grid; tiles outside it are ignored.
    Declared,
}

impl ExtentPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtentPolicy::InferFromTiles => "tiles",
            ExtentPolicy::Declared => "declared",
        }
    }
}

impl FromStr for ExtentPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tiles" | "infer" => Ok(ExtentPolicy::InferFromTiles),
            "declared" => Ok(ExtentPolicy::Declared),
            other => Err(format!("unknown extent policy '{}'", other)),
        }
    }
}

impl fmt::Display for ExtentPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for reconstructing mosaics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StitchConfig {
    extent_policy: ExtentPolicy,
    grid_shape: GridShape,
    /// Revisit specimens whose manifest exists; existing mosaics are kept
    clobber: bool,
    /// Compute threads, 0 for all cores
    threads: usize,
    jpeg_quality: u8,
}

impl StitchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_extent_policy(mut self, mode: ExtentPolicy) -> Self {
        self.extent_policy = mode;
        self
    }

    pub fn with_grid_shape(mut self, shape: GridShape) -> Self {
        self.grid_shape = shape;
        self
    }

    pub fn with_clobber(mut self, clobber: bool) -> Self {
        self.clobber = clobber;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Set the JPEG quality, clamped to 1-100.
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn extent_policy(&self) -> ExtentPolicy {
        self.extent_policy
    }

    pub fn grid_shape(&self) -> GridShape {
        self.grid_shape
    }

    pub fn clobber(&self) -> bool {
        self.clobber
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality
    }
}

impl Default for StitchConfig {
    fn default() -> Self {
        Self {
            extent_policy: ExtentPolicy::default(),
            grid_shape: GridShape::default(),
            clobber: false,
            threads: 0,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extent_policy_parse() {
        assert_eq!("tiles".parse(), Ok(ExtentPolicy::InferFromTiles));
        assert_eq!(" Declared ".parse(), Ok(ExtentPolicy::Declared));
        assert!("bogus".parse::<ExtentPolicy>().is_err());
        assert_eq!(ExtentPolicy::Declared.to_string(), "declared");
    }

    #[test]
    fn test_builder_chain() {
        let config = StitchConfig::new()
            .with_clobber(true)
            .with_threads(4)
            .with_jpeg_quality(0);
        assert!(config.clobber());
        assert_eq!(config.threads(), 4);
        assert_eq!(config.jpeg_quality(), 1);
        assert_eq!(config.extent_policy(), ExtentPolicy::InferFromTiles);
    }
}
