//! Tile addressing for the image pyramid.
//!
//! Pure functions that map catalog dimensions to a tile grid and tile
//! coordinates to remote URLs and local file paths. Nothing here touches the
//! network or the filesystem.
//!
//! # Grid layout
//!
//! ```text
//!   x →   0        1        2
//! y ┌────────┬────────┬────────┐
//! ↓ │ 5-0-0  │ 5-1-0  │ 5-2-0  │   each cell is a 256×256 tile,
//! 0 │        │        │        │   named {zoom}-{x}-{y}.jpg
//!   ├────────┼────────┼────────┤
//! 1 │ 5-0-1  │ 5-1-1  │ 5-2-1  │   edge tiles may be smaller
//!   └────────┴────────┴────────┘
//! ```

mod types;

pub use types::{GridShape, TileCoord, TileGrid, TileGridIter};

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

/// Edge length of a tile in pixels.
pub const TILE_SIZE: u32 = 256;

/// Fixed tile group segment used by the remote pyramid service.
pub const TILE_GROUP: &str = "TileGroup5";

/// Extension of stored tiles.
pub const TILE_EXTENSION: &str = "jpg";

/// Number of tiles needed to cover `extent` pixels.
///
/// `extent / 256`, plus one unless the division is exact.
#[inline]
pub fn grid_size(extent: u32) -> u32 {
    let whole = extent / TILE_SIZE;
    if extent % TILE_SIZE == 0 {
        whole
    } else {
        whole + 1
    }
}

/// Inputs needed to address tiles of one image on the remote service.
///
/// The `width`/`height` are the full image dimensions from the catalog, not
/// tile dimensions; the service uses them together with the crop offsets to
/// locate the crop region server side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileAddress {
    /// Service base URL, expected to end with `/`.
    pub base_url: String,
    /// Path of the image pyramid below the base URL.
    pub remote_path: String,
    pub crop_top: u32,
    pub crop_left: u32,
    pub width: u32,
    pub height: u32,
}

impl TileAddress {
    /// Remote URL of a single tile.
    pub fn url(&self, coord: TileCoord) -> String {
        tile_url(
            &self.base_url,
            &self.remote_path,
            coord,
            self.crop_top,
            self.crop_left,
            self.width,
            self.height,
        )
    }
}

/// Builds the bit-exact remote URL for a tile.
///
/// `{base}{remote_path}/TileGroup5/{zoom}-{x}-{y}.jpg?siTop=..&siLeft=..&siWidth=..&siHeight=..`
pub fn tile_url(
    base_url: &str,
    remote_path: &str,
    coord: TileCoord,
    crop_top: u32,
    crop_left: u32,
    width: u32,
    height: u32,
) -> String {
    format!(
        "{}{}/{}/{}?siTop={}&siLeft={}&siWidth={}&siHeight={}",
        base_url,
        remote_path,
        TILE_GROUP,
        coord.file_name(),
        crop_top,
        crop_left,
        width,
        height
    )
}

/// Local path of a tile inside an identifier's tile directory.
pub fn tile_path(image_dir: &Path, coord: TileCoord) -> PathBuf {
    image_dir.join(coord.file_name())
}

fn tile_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // Only complete tiles; temp files from in-progress writes never match.
        Regex::new(r"^(\d+)-(\d+)-(\d+)\.jpg$").expect("tile name pattern is valid")
    })
}

/// Parses a tile file name of the form `{zoom}-{x}-{y}.jpg`.
pub fn parse_tile_file_name(name: &str) -> Option<TileCoord> {
    let caps = tile_name_pattern().captures(name)?;
    let zoom = caps[1].parse().ok()?;
    let x = caps[2].parse().ok()?;
    let y = caps[3].parse().ok()?;
    Some(TileCoord::new(zoom, x, y))
}
