//! Batch stitching over a catalog.
//!
//! Manifests are refreshed in two tiers:
//!
//! - a specimen whose manifest exists is skipped entirely unless `clobber`
//!   is set;
//! - the global manifest is rebuilt on every run from every per-specimen
//!   manifest under the output root, regardless of `clobber`, so specimens
//!   stitched by earlier runs stay listed.
//!
//! A mosaic that already exists is never rebuilt. `clobber` only reopens
//! skipped specimens, filling in missing mosaics and rewriting the manifest.
//! Delete a mosaic to have it reconstructed.

use std::path::PathBuf;

use tracing::{debug, error, info, warn};

use super::error::{StitchError, StitchResult};
use super::manifest::{merge_manifests, read_manifest, write_manifest, ManifestRow};
use crate::catalog::{Catalog, ImageRecord};
use crate::config::StitchConfig;
use crate::layout::StorageLayout;
use crate::mosaic::{MosaicReconstructor, Reconstruction};

/// Outcome of a stitch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StitchSummary {
    /// Mosaics written by this run.
    pub written: usize,
    /// Mosaics already on disk and left alone.
    pub existing: usize,
    /// Identifiers without any tiles.
    pub no_tiles: Vec<String>,
    /// Identifiers whose reconstruction failed.
    pub failed: Vec<String>,
    /// Specimens skipped because their manifest exists.
    pub specimens_skipped: usize,
    /// Rows in the rebuilt global manifest.
    pub global_rows: usize,
}

/// Runs the stitch stage over a whole catalog.
pub struct StitchCoordinator {
    reconstructor: MosaicReconstructor,
    layout: StorageLayout,
    config: StitchConfig,
}

impl StitchCoordinator {
    /// Creates a coordinator and its compute pool.
    pub fn new(layout: StorageLayout, config: StitchConfig) -> StitchResult<Self> {
        Ok(Self {
            reconstructor: MosaicReconstructor::from_config(&config)?,
            layout,
            config,
        })
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Stitches every specimen of the catalog and refreshes the manifests.
    pub fn run(&self, catalog: &Catalog) -> StitchResult<StitchSummary> {
        let mut summary = StitchSummary::default();
        let specimens = catalog.by_specimen();

        info!(
            identifiers = catalog.len(),
            specimens = specimens.len(),
            threads = self.reconstructor.threads(),
            clobber = self.config.clobber(),
            "Starting stitch"
        );

        for (sub, records) in &specimens {
            let manifest = self.layout.specimen_manifest_path(sub);
            if !self.config.clobber() && manifest.exists() {
                debug!(sub, "Specimen manifest exists, skipping");
                summary.specimens_skipped += 1;
                continue;
            }

            for record in records {
                self.stitch_record(record, &mut summary);
            }

            let rows: Vec<ManifestRow> = records
                .iter()
                .filter_map(|record| {
                    let path = self.layout.mosaic_path(record);
                    path.exists().then(|| ManifestRow::from_record(record, path))
                })
                .collect();
            write_manifest(&manifest, &rows)?;
            info!(sub, rows = rows.len(), "Specimen manifest written");
        }

        summary.global_rows = self.refresh_global_manifest()?;

        info!(
            written = summary.written,
            existing = summary.existing,
            no_tiles = summary.no_tiles.len(),
            failed = summary.failed.len(),
            specimens_skipped = summary.specimens_skipped,
            global_rows = summary.global_rows,
            "Stitch finished"
        );
        Ok(summary)
    }

    fn stitch_record(&self, record: &ImageRecord, summary: &mut StitchSummary) {
        let output = self.layout.mosaic_path(record);
        if output.exists() {
            debug!(identifier = %record.identifier, "Mosaic exists");
            summary.existing += 1;
            return;
        }

        let grid = record.grid(self.config.grid_shape());
        let tile_dir = self.layout.image_tile_dir(record);

        match self.reconstructor.reconstruct(
            &record.identifier,
            &grid,
            &tile_dir,
            &output,
            self.config.extent_policy(),
        ) {
            Ok(Reconstruction::Written(_)) => summary.written += 1,
            Ok(Reconstruction::NoTiles) => {
                warn!(identifier = %record.identifier, sub = %record.sub, "No tiles to stitch");
                summary.no_tiles.push(record.identifier.clone());
            }
            Err(e) => {
                error!(identifier = %record.identifier, error = %e, "Reconstruction failed");
                summary.failed.push(record.identifier.clone());
            }
        }
    }

    /// Rebuilds the global manifest from every per-specimen manifest on disk,
    /// in specimen order.
    fn refresh_global_manifest(&self) -> StitchResult<usize> {
        let pattern = self.layout.specimen_manifest_pattern();
        let entries = glob::glob(&pattern).map_err(|e| StitchError::ManifestScan {
            pattern: pattern.clone(),
            reason: e.to_string(),
        })?;

        let mut paths: Vec<PathBuf> = entries.filter_map(Result::ok).collect();
        paths.sort();

        let mut tables = Vec::with_capacity(paths.len());
        for path in &paths {
            tables.push(read_manifest(path)?);
        }

        let rows = merge_manifests(tables);
        write_manifest(&self.layout.global_manifest_path(), &rows)?;
        debug!(manifests = paths.len(), rows = rows.len(), "Global manifest rebuilt");
        Ok(rows.len())
    }
}
