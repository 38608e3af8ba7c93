//! Mosaic reconstruction.
//!
//! Rebuilds one identifier's full-resolution image from the sparse set of
//! tiles on disk:
//!
//! 1. List `{zoom}-{x}-{y}.jpg` files and derive the grid extent
//! 2. Decode each column of tiles in parallel into a column strip
//! 3. Merge the strips into a zeroed raster, one after another
//! 4. Encode the raster as single-channel JPEG and write it atomically
//!
//! Missing tiles leave zeroed regions. Tiles that fail to decode are deleted
//! (see [`TileLoad::Repaired`]) so that a later fetch downloads them again.

mod error;
mod raster;
mod reconstructor;
mod tile;

pub use error::{MosaicError, MosaicResult};
pub use raster::{ColumnStrip, MosaicRaster};
pub use reconstructor::{
    Assembled, MosaicReconstructor, MosaicReport, Reconstruction,
    JPEG_MAX_DIMENSION,
};
pub use tile::{load_tile, luminance, TileLoad};
