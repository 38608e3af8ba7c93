//! Grid and coordinate types.

use std::fmt;
use std::str::FromStr;

use super::{grid_size, TILE_EXTENSION};

/// A tile position in the pyramid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    pub zoom: u32,
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    pub fn new(zoom: u32, x: u32, y: u32) -> Self {
        Self { zoom, x, y }
    }

    /// File name used both remotely and on disk: `{zoom}-{x}-{y}.jpg`.
    pub fn file_name(&self) -> String {
        format!("{}-{}-{}.{}", self.zoom, self.x, self.y, TILE_EXTENSION)
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.zoom, self.x, self.y)
    }
}

/// How the number of tile rows is derived from the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GridShape {
    /// Rows are computed from the image height: `ceil(height / 256)`.
    #[default]
    Independent,
    /// Rows equal columns regardless of height. Reproduces legacy downloads,
    /// which over- or under-fetch rows on non-square images.
    Square,
}

impl GridShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            GridShape::Independent => "independent",
            GridShape::Square => "square",
        }
    }
}

impl FromStr for GridShape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "independent" => Ok(GridShape::Independent),
            "square" => Ok(GridShape::Square),
            other => Err(format!("unknown grid shape '{}'", other)),
        }
    }
}

impl fmt::Display for GridShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The tile grid of one identifier at its finest zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    pub zoom: u32,
    pub num_tiles_x: u32,
    pub num_tiles_y: u32,
}

impl TileGrid {
    pub fn new(zoom: u32, num_tiles_x: u32, num_tiles_y: u32) -> Self {
        Self {
            zoom,
            num_tiles_x,
            num_tiles_y,
        }
    }

    /// Grid for an image of `width`×`height` pixels at the finest of
    /// `tier_count` zoom tiers.
    pub fn for_image(width: u32, height: u32, tier_count: u32, shape: GridShape) -> Self {
        let num_tiles_x = grid_size(width);
        let num_tiles_y = match shape {
            GridShape::Independent => grid_size(height),
            GridShape::Square => num_tiles_x,
        };
        Self::new(tier_count.saturating_sub(1), num_tiles_x, num_tiles_y)
    }

    /// Total number of tiles in the grid.
    pub fn len(&self) -> usize {
        self.num_tiles_x as usize * self.num_tiles_y as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, coord: TileCoord) -> bool {
        coord.zoom == self.zoom && coord.x < self.num_tiles_x && coord.y < self.num_tiles_y
    }

    /// Iterates all coordinates, x-major then y.
    pub fn coords(&self) -> TileGridIter {
        TileGridIter {
            grid: *self,
            x: 0,
            y: 0,
        }
    }
}

/// Iterator over the coordinates of a [`TileGrid`].
#[derive(Debug, Clone)]
pub struct TileGridIter {
    grid: TileGrid,
    x: u32,
    y: u32,
}

impl Iterator for TileGridIter {
    type Item = TileCoord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.grid.num_tiles_y == 0 || self.x >= self.grid.num_tiles_x {
            return None;
        }

        let coord = TileCoord::new(self.grid.zoom, self.x, self.y);
        self.y += 1;
        if self.y >= self.grid.num_tiles_y {
            self.y = 0;
            self.x += 1;
        }
        Some(coord)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.grid.num_tiles_y == 0 || self.x >= self.grid.num_tiles_x {
            return (0, Some(0));
        }
        let remaining = (self.grid.num_tiles_x - self.x) as usize * self.grid.num_tiles_y as usize
            - self.y as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for TileGridIter {}
