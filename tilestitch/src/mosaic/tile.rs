//! Loading single tiles from disk.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, Luma};
use tracing::warn;

/// Result of loading one grid slot.
#[derive(Debug)]
pub enum TileLoad {
    /// Decoded luminance tile, any size.
    Decoded(GrayImage),
    /// No usable file for this slot.
    Missing,
    /// The file did not decode and has been deleted; the slot is treated as
    /// missing and a later fetch will download it again.
    Repaired { path: PathBuf, error: String },
}

/// Loads and decodes the tile at `path`, repairing it if it is corrupt.
pub fn load_tile(path: &Path) -> TileLoad {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return TileLoad::Missing,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Unreadable tile treated as missing");
            return TileLoad::Missing;
        }
    };

    match image::load_from_memory(&bytes) {
        Ok(img) => TileLoad::Decoded(luminance(&img)),
        Err(e) => repair(path, e.to_string()),
    }
}

/// Deletes a corrupt tile.
pub fn repair(path: &Path, error: String) -> TileLoad {
    warn!(path = %path.display(), error = %error, "Corrupt tile deleted");
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Failed to delete corrupt tile");
        }
    }
    TileLoad::Repaired {
        path: path.to_path_buf(),
        error,
    }
}

/// Single-channel image holding the mean of the colour channels.
pub fn luminance(img: &DynamicImage) -> GrayImage {
    let rgb = img.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        Luma([((r as u16 + g as u16 + b as u16) / 3) as u8])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::jpeg_tile;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_luminance_is_channel_mean() {
        let img = RgbImage::from_pixel(2, 2, Rgb([30, 60, 90]));
        let gray = luminance(&DynamicImage::ImageRgb8(img));
        assert_eq!(gray.get_pixel(1, 1).0, [60]);
    }

    #[test]
    fn test_load_valid_tile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("0-0-0.jpg");
        std::fs::write(&path, jpeg_tile(200, 256, 256)).unwrap();

        match load_tile(&path) {
            TileLoad::Decoded(img) => {
                assert_eq!(img.dimensions(), (256, 256));
                assert!(img.get_pixel(128, 128).0[0] > 150);
            }
            other => panic!("unexpected load: {:?}", other),
        }
    }

    #[test]
    fn test_missing_tile() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_tile(&dir.path().join("0-0-0.jpg")),
            TileLoad::Missing
        ));
    }

    #[test]
    fn test_corrupt_tile_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("0-1-0.jpg");
        std::fs::write(&path, b"<html>rate limited</html>").unwrap();

        assert!(matches!(load_tile(&path), TileLoad::Repaired { .. }));
        assert!(!path.exists());
        assert!(matches!(load_tile(&path), TileLoad::Missing));
    }
}
