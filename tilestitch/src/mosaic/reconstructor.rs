//! Mosaic reconstruction for one identifier.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::error::{MosaicError, MosaicResult};
use super::raster::{ColumnStrip, MosaicRaster};
use super::tile::{load_tile, TileLoad};
use crate::config::{ExtentPolicy, StitchConfig};
use crate::grid::{parse_tile_file_name, tile_path, TileCoord, TileGrid, TILE_SIZE};

/// Largest side a baseline JPEG can encode.
pub const JPEG_MAX_DIMENSION: u32 = u16::MAX as u32;

/// Counts for one reconstructed raster.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MosaicReport {
    pub width: u32,
    pub height: u32,
    pub tiles_placed: usize,
    pub tiles_missing: usize,
    /// Corrupt tiles deleted during this pass.
    pub repaired: Vec<PathBuf>,
    /// Files outside a declared extent.
    pub ignored: usize,
}

/// An assembled raster and its report.
#[derive(Debug)]
pub struct Assembled {
    pub raster: MosaicRaster,
    pub report: MosaicReport,
}

/// Outcome of a reconstruction.
#[derive(Debug, PartialEq, Eq)]
pub enum Reconstruction {
    /// Nothing to stitch; no output written.
    NoTiles,
    /// Output written.
    Written(MosaicReport),
}

/// Per-column tallies, summed after the parallel pass.
#[derive(Default)]
struct ColumnStats {
    placed: usize,
    missing: usize,
    repaired: Vec<PathBuf>,
}

/// Rebuilds full-resolution images from tile directories.
///
/// Columns are decoded in parallel on a dedicated rayon pool that lives as
/// long as the reconstructor.
pub struct MosaicReconstructor {
    pool: rayon::ThreadPool,
    jpeg_quality: u8,
}

impl MosaicReconstructor {
    /// Creates a reconstructor with `threads` workers (0 = all cores).
    pub fn new(threads: usize, jpeg_quality: u8) -> MosaicResult<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("tilestitch-mosaic-{}", i))
            .build()
            .map_err(|e| MosaicError::ThreadPool(e.to_string()))?;

        Ok(Self {
            pool,
            jpeg_quality: jpeg_quality.clamp(1, 100),
        })
    }

    pub fn from_config(config: &StitchConfig) -> MosaicResult<Self> {
        Self::new(config.threads(), config.jpeg_quality())
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Reconstructs one identifier and writes it to `output_path`.
    ///
    /// `grid` supplies the zoom level and, under [`ExtentPolicy::Declared`],
    /// the canvas size in tiles.
    pub fn reconstruct(
        &self,
        identifier: &str,
        grid: &TileGrid,
        tile_dir: &Path,
        output_path: &Path,
        extent: ExtentPolicy,
    ) -> MosaicResult<Reconstruction> {
        let Some(assembled) = self.assemble(identifier, grid, tile_dir, extent)? else {
            info!(identifier, tile_dir = %tile_dir.display(), "No tiles found");
            return Ok(Reconstruction::NoTiles);
        };

        let Assembled { raster, report } = assembled;
        self.write_jpeg(raster, output_path)?;

        info!(
            identifier,
            width = report.width,
            height = report.height,
            placed = report.tiles_placed,
            missing = report.tiles_missing,
            repaired = report.repaired.len(),
            output = %output_path.display(),
            "Mosaic written"
        );
        Ok(Reconstruction::Written(report))
    }

    /// Assembles the raster in memory. `None` when no tiles are present.
    pub fn assemble(
        &self,
        identifier: &str,
        grid: &TileGrid,
        tile_dir: &Path,
        extent: ExtentPolicy,
    ) -> MosaicResult<Option<Assembled>> {
        let zoom = grid.zoom;
        let found = scan_tiles(tile_dir, zoom)?;

        let (tiles_x, tiles_y, present, ignored) = match extent {
            ExtentPolicy::InferFromTiles => {
                let (Some(max_x), Some(max_y)) = (
                    found.iter().map(|c| c.x).max(),
                    found.iter().map(|c| c.y).max(),
                ) else {
                    return Ok(None);
                };
                (max_x + 1, max_y + 1, found, 0)
            }
            ExtentPolicy::Declared => {
                let (tiles_x, tiles_y) = (grid.num_tiles_x, grid.num_tiles_y);
                let total = found.len();
                let inside: HashSet<TileCoord> = found
                    .into_iter()
                    .filter(|c| c.x < tiles_x && c.y < tiles_y)
                    .collect();
                let ignored = total - inside.len();
                if ignored > 0 {
                    warn!(identifier, ignored, tiles_x, tiles_y, "Tiles outside declared extent ignored");
                }
                if inside.is_empty() {
                    return Ok(None);
                }
                (tiles_x, tiles_y, inside, ignored)
            }
        };

        let width = u64::from(tiles_x) * u64::from(TILE_SIZE);
        let height = u64::from(tiles_y) * u64::from(TILE_SIZE);
        if width > u64::from(JPEG_MAX_DIMENSION) || height > u64::from(JPEG_MAX_DIMENSION) {
            return Err(MosaicError::TooLarge {
                width,
                height,
                limit: JPEG_MAX_DIMENSION,
            });
        }

        debug!(identifier, tiles_x, tiles_y, present = present.len(), "Assembling mosaic");

        let columns: Vec<(ColumnStrip, ColumnStats)> = self.pool.install(|| {
            (0..tiles_x)
                .into_par_iter()
                .map(|x| build_column(tile_dir, zoom, x, tiles_y, &present))
                .collect()
        });

        let mut raster = MosaicRaster::for_grid(tiles_x, tiles_y);
        let mut report = MosaicReport {
            width: raster.width(),
            height: raster.height(),
            ignored,
            ..MosaicReport::default()
        };
        for (strip, stats) in columns {
            raster.merge_column(&strip);
            report.tiles_placed += stats.placed;
            report.tiles_missing += stats.missing;
            report.repaired.extend(stats.repaired);
        }

        Ok(Some(Assembled { raster, report }))
    }

    /// Encodes as single-channel JPEG via a `.part` sibling and rename.
    fn write_jpeg(&self, raster: MosaicRaster, output_path: &Path) -> MosaicResult<()> {
        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| MosaicError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let (width, height) = (u64::from(raster.width()), u64::from(raster.height()));
        let image = raster.into_image().ok_or(MosaicError::TooLarge {
            width,
            height,
            limit: JPEG_MAX_DIMENSION,
        })?;

        let mut temp = output_path.as_os_str().to_os_string();
        temp.push(".part");
        let temp = PathBuf::from(temp);

        let write_err = |e| MosaicError::Write {
            path: temp.clone(),
            source: e,
        };
        let file = File::create(&temp).map_err(write_err)?;
        let mut writer = BufWriter::new(file);
        JpegEncoder::new_with_quality(&mut writer, self.jpeg_quality)
            .encode_image(&image)
            .map_err(|e| MosaicError::Encode {
                path: output_path.to_path_buf(),
                source: e,
            })?;
        writer.flush().map_err(write_err)?;
        drop(writer);

        std::fs::rename(&temp, output_path).map_err(|e| MosaicError::Write {
            path: output_path.to_path_buf(),
            source: e,
        })
    }
}

/// Lists tiles of `zoom` in `dir`. A missing directory has no tiles.
fn scan_tiles(dir: &Path, zoom: u32) -> MosaicResult<HashSet<TileCoord>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HashSet::new()),
        Err(e) => {
            return Err(MosaicError::ListTiles {
                path: dir.to_path_buf(),
                source: e,
            })
        }
    };

    Ok(entries
        .filter_map(|e| e.ok())
        .filter_map(|e| parse_tile_file_name(&e.file_name().to_string_lossy()))
        .filter(|c| c.zoom == zoom)
        .collect())
}

fn build_column(
    tile_dir: &Path,
    zoom: u32,
    x: u32,
    tiles_y: u32,
    present: &HashSet<TileCoord>,
) -> (ColumnStrip, ColumnStats) {
    let mut strip = ColumnStrip::new(x, tiles_y);
    let mut stats = ColumnStats::default();

    for y in 0..tiles_y {
        let coord = TileCoord::new(zoom, x, y);
        if !present.contains(&coord) {
            stats.missing += 1;
            continue;
        }

        match load_tile(&tile_path(tile_dir, coord)) {
            TileLoad::Decoded(tile) => {
                strip.place(y, &tile);
                stats.placed += 1;
            }
            TileLoad::Missing => stats.missing += 1,
            TileLoad::Repaired { path, .. } => {
                stats.missing += 1;
                stats.repaired.push(path);
            }
        }
    }

    (strip, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::jpeg_tile;

    fn write_tile(dir: &Path, coord: TileCoord, value: u8) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(tile_path(dir, coord), jpeg_tile(value, 256, 256)).unwrap();
    }

    fn grid(zoom: u32, tiles_x: u32, tiles_y: u32) -> TileGrid {
        TileGrid::new(zoom, tiles_x, tiles_y)
    }

    fn reconstructor() -> MosaicReconstructor {
        MosaicReconstructor::new(2, 90).unwrap()
    }

    #[test]
    fn test_missing_tile_region_is_zero() {
        let dir = tempfile::tempdir().unwrap();
        for x in 0..3 {
            for y in 0..2 {
                if (x, y) != (2, 1) {
                    write_tile(dir.path(), TileCoord::new(0, x, y), 200);
                }
            }
        }

        let assembled = reconstructor()
            .assemble("0001", &grid(0, 1, 1), dir.path(), ExtentPolicy::InferFromTiles)
            .unwrap()
            .unwrap();

        assert_eq!(assembled.raster.width(), 768);
        assert_eq!(assembled.raster.height(), 512);
        assert_eq!(assembled.report.tiles_placed, 5);
        assert_eq!(assembled.report.tiles_missing, 1);
        assert!(assembled.raster.region(512, 256, 256, 256).all(|v| v == 0));
        assert!(assembled.raster.region(512, 0, 256, 256).all(|v| v > 150));
        assert!(assembled.raster.region(0, 256, 512, 256).all(|v| v > 150));
    }

    #[test]
    fn test_corrupt_tile_repaired_once() {
        let dir = tempfile::tempdir().unwrap();
        write_tile(dir.path(), TileCoord::new(0, 0, 0), 200);
        let corrupt = tile_path(dir.path(), TileCoord::new(0, 1, 0));
        std::fs::write(&corrupt, b"not a jpeg").unwrap();

        let first = reconstructor()
            .assemble("0001", &grid(0, 1, 1), dir.path(), ExtentPolicy::InferFromTiles)
            .unwrap()
            .unwrap();
        assert_eq!(first.report.repaired, vec![corrupt.clone()]);
        assert!(!corrupt.exists());
        assert!(first.raster.region(256, 0, 256, 256).all(|v| v == 0));

        let second = reconstructor()
            .assemble("0001", &grid(0, 1, 1), dir.path(), ExtentPolicy::InferFromTiles)
            .unwrap()
            .unwrap();
        assert!(second.report.repaired.is_empty());
        // The extent shrank back to the tiles that remain.
        assert_eq!(second.raster.width(), 256);
    }

    #[test]
    fn test_single_tile_of_two_by_two_grid() {
        let dir = tempfile::tempdir().unwrap();
        write_tile(dir.path(), TileCoord::new(0, 0, 0), 200);

        let declared = TileGrid::for_image(300, 260, 1, crate::grid::GridShape::Independent);
        let assembled = reconstructor()
            .assemble("0001", &declared, dir.path(), ExtentPolicy::Declared)
            .unwrap()
            .unwrap();

        assert_eq!(assembled.raster.width(), 512);
        assert_eq!(assembled.raster.height(), 512);
        assert!(assembled.raster.region(0, 0, 256, 256).all(|v| v > 150));
        assert!(assembled.raster.region(256, 0, 256, 512).all(|v| v == 0));
        assert!(assembled.raster.region(0, 256, 256, 256).all(|v| v == 0));

        let inferred = reconstructor()
            .assemble("0001", &grid(0, 1, 1), dir.path(), ExtentPolicy::InferFromTiles)
            .unwrap()
            .unwrap();
        assert_eq!(inferred.raster.width(), 256);
    }

    #[test]
    fn test_declared_extent_ignores_outside_tiles() {
        let dir = tempfile::tempdir().unwrap();
        write_tile(dir.path(), TileCoord::new(0, 0, 0), 200);
        write_tile(dir.path(), TileCoord::new(0, 4, 0), 200);

        let assembled = reconstructor()
            .assemble("0001", &grid(0, 2, 1), dir.path(), ExtentPolicy::Declared)
            .unwrap()
            .unwrap();
        assert_eq!(assembled.raster.width(), 512);
        assert_eq!(assembled.report.ignored, 1);
    }

    #[test]
    fn test_configured_extent_sizes_canvas_from_grid() {
        let dir = tempfile::tempdir().unwrap();
        write_tile(dir.path(), TileCoord::new(0, 0, 0), 200);
        let config = StitchConfig::new().with_extent_policy("declared".parse().unwrap());

        let assembled = reconstructor()
            .assemble("0001", &grid(0, 3, 2), dir.path(), config.extent_policy())
            .unwrap()
            .unwrap();
        assert_eq!((assembled.raster.width(), assembled.raster.height()), (768, 512));
    }

    #[test]
    fn test_other_files_ignored() {
        let dir = tempfile::tempdir().unwrap();
        write_tile(dir.path(), TileCoord::new(3, 0, 0), 200);
        std::fs::write(dir.path().join("3-5-5.jpg.part"), b"partial").unwrap();
        std::fs::write(dir.path().join("2-9-9.jpg"), b"other zoom").unwrap();

        let assembled = reconstructor()
            .assemble("0001", &grid(3, 1, 1), dir.path(), ExtentPolicy::InferFromTiles)
            .unwrap()
            .unwrap();
        assert_eq!(assembled.raster.width(), 256);
        assert!(dir.path().join("2-9-9.jpg").exists());
    }

    #[test]
    fn test_no_tiles() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.jpg");
        let r = reconstructor();

        assert_eq!(
            r.reconstruct("0001", &grid(0, 1, 1), dir.path(), &output, ExtentPolicy::InferFromTiles)
                .unwrap(),
            Reconstruction::NoTiles
        );
        assert_eq!(
            r.reconstruct(
                "0001",
                &grid(0, 1, 1),
                &dir.path().join("absent"),
                &output,
                ExtentPolicy::InferFromTiles
            )
            .unwrap(),
            Reconstruction::NoTiles
        );
        assert!(!output.exists());
    }

    #[test]
    fn test_reconstruct_writes_grayscale_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let tiles = dir.path().join("tiles");
        write_tile(&tiles, TileCoord::new(0, 0, 0), 200);
        write_tile(&tiles, TileCoord::new(0, 1, 1), 200);
        let output = dir.path().join("sub-a").join("sub-a_0001.jpg");

        let outcome = reconstructor()
            .reconstruct("0001", &grid(0, 1, 1), &tiles, &output, ExtentPolicy::InferFromTiles)
            .unwrap();
        assert!(matches!(outcome, Reconstruction::Written(ref r) if r.tiles_placed == 2));

        let decoded = image::open(&output).unwrap();
        assert_eq!(decoded.color(), image::ColorType::L8);
        assert_eq!((decoded.width(), decoded.height()), (512, 512));
        assert!(!dir.path().join("sub-a").join("sub-a_0001.jpg.part").exists());
    }

    #[test]
    fn test_too_large() {
        let dir = tempfile::tempdir().unwrap();
        write_tile(dir.path(), TileCoord::new(0, 0, 0), 200);

        let err = reconstructor()
            .assemble("0001", &grid(0, 300, 1), dir.path(), ExtentPolicy::Declared)
            .unwrap_err();
        assert!(matches!(err, MosaicError::TooLarge { .. }));
    }
}
