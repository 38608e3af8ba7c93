//! Raster buffers.
//!
//! A [`ColumnStrip`] is one grid column, `256` pixels wide and the full
//! raster height, owned by a single compute task. Strips are merged into the
//! [`MosaicRaster`] sequentially.

use image::GrayImage;

use crate::grid::TILE_SIZE;

const TILE: usize = TILE_SIZE as usize;

/// Single-channel mosaic, row-major, zero where no tile was placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MosaicRaster {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl MosaicRaster {
    /// Zeroed raster for a grid of `tiles_x` × `tiles_y` tiles.
    pub fn for_grid(tiles_x: u32, tiles_y: u32) -> Self {
        let width = tiles_x * TILE_SIZE;
        let height = tiles_y * TILE_SIZE;
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> u8 {
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    /// Iterates the pixels of a rectangle, row by row.
    pub fn region(
        &self,
        x0: u32,
        y0: u32,
        width: u32,
        height: u32,
    ) -> impl Iterator<Item = u8> + '_ {
        (y0..y0 + height).flat_map(move |y| (x0..x0 + width).map(move |x| self.pixel(x, y)))
    }

    /// Copies a column strip into grid column `strip.x`.
    pub fn merge_column(&mut self, strip: &ColumnStrip) {
        let offset = strip.x as usize * TILE;
        let stride = self.width as usize;
        for (row, src) in strip.pixels.chunks_exact(TILE).enumerate() {
            let start = row * stride + offset;
            self.pixels[start..start + TILE].copy_from_slice(src);
        }
    }

    /// Converts into an `image` buffer for encoding.
    pub fn into_image(self) -> Option<GrayImage> {
        GrayImage::from_raw(self.width, self.height, self.pixels)
    }
}

/// One grid column of the mosaic.
#[derive(Debug, Clone)]
pub struct ColumnStrip {
    x: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl ColumnStrip {
    /// Zeroed strip for column `x` of a grid `tiles_y` tiles high.
    pub fn new(x: u32, tiles_y: u32) -> Self {
        let height = tiles_y * TILE_SIZE;
        Self {
            x,
            height,
            pixels: vec![0; height as usize * TILE],
        }
    }

    pub fn x(&self) -> u32 {
        self.x
    }

    /// Places a tile at grid row `y`.
    ///
    /// The tile's top-left lands on the slot's top-left; anything beyond
    /// 256×256 is clipped and any uncovered area stays zero.
    pub fn place(&mut self, y: u32, tile: &GrayImage) {
        let w = tile.width().min(TILE_SIZE) as usize;
        let h = tile.height().min(TILE_SIZE);
        let src = tile.as_raw();
        let src_stride = tile.width() as usize;

        for row in 0..h {
            let dst_row = (y * TILE_SIZE + row) as usize;
            if dst_row >= self.height as usize {
                break;
            }
            let dst = dst_row * TILE;
            let from = row as usize * src_stride;
            self.pixels[dst..dst + w].copy_from_slice(&src[from..from + w]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_place_and_merge() {
        let mut raster = MosaicRaster::for_grid(2, 2);
        let mut strip = ColumnStrip::new(1, 2);
        strip.place(1, &GrayImage::from_pixel(256, 256, Luma([7])));
        raster.merge_column(&strip);

        assert_eq!(raster.pixel(256, 256), 7);
        assert_eq!(raster.pixel(511, 511), 7);
        assert_eq!(raster.pixel(255, 256), 0);
        assert_eq!(raster.pixel(256, 255), 0);
    }

    #[test]
    fn test_undersized_tile_top_left() {
        let mut raster = MosaicRaster::for_grid(1, 1);
        let mut strip = ColumnStrip::new(0, 1);
        strip.place(0, &GrayImage::from_pixel(100, 50, Luma([9])));
        raster.merge_column(&strip);

        assert_eq!(raster.pixel(99, 49), 9);
        assert_eq!(raster.pixel(100, 0), 0);
        assert_eq!(raster.pixel(0, 50), 0);
    }

    #[test]
    fn test_oversized_tile_clipped() {
        let mut raster = MosaicRaster::for_grid(2, 2);
        let mut strip = ColumnStrip::new(0, 2);
        strip.place(0, &GrayImage::from_pixel(300, 300, Luma([5])));
        raster.merge_column(&strip);

        assert_eq!(raster.pixel(255, 255), 5);
        assert!(raster.region(256, 0, 256, 512).all(|v| v == 0));
        assert!(raster.region(0, 256, 256, 256).all(|v| v == 0));
    }

    #[test]
    fn test_into_image_dimensions() {
        let img = MosaicRaster::for_grid(3, 2).into_image().unwrap();
        assert_eq!(img.dimensions(), (768, 512));
    }
}
