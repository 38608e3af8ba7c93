//! Batch fetch over a catalog.
//!
//! Identifiers are processed one at a time, grouped by specimen. An
//! identifier whose completion marker exists is skipped without any network
//! traffic; a fatal error for one identifier is logged and counted and the
//! batch moves on.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info};

use super::client::TileClient;
use super::error::{FetchError, FetchResult};
use super::fetcher::{FetchReport, FetchRequest, TileFetcher};
use crate::catalog::{Catalog, ImageRecord};
use crate::config::FetchConfig;
use crate::layout::StorageLayout;

/// Result of one identifier within a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordFetch {
    /// Marker already present; nothing requested.
    Skipped,
    /// Grid fetched and marker written.
    Completed(FetchReport),
}

/// Outcome of a batch fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchSummary {
    pub completed: usize,
    pub skipped: usize,
    /// Identifiers left without a marker, in processing order.
    pub aborted: Vec<String>,
    /// Tile counts summed over completed identifiers.
    pub tiles: FetchReport,
}

impl FetchSummary {
    pub fn processed(&self) -> usize {
        self.completed + self.skipped + self.aborted.len()
    }

    pub fn is_clean(&self) -> bool {
        self.aborted.is_empty()
    }
}

/// Runs the fetch stage over a whole catalog.
pub struct FetchCoordinator<C> {
    fetcher: TileFetcher<C>,
    layout: StorageLayout,
    config: FetchConfig,
}

impl<C> FetchCoordinator<C>
where
    C: TileClient + 'static,
{
    pub fn new(client: Arc<C>, layout: StorageLayout, config: FetchConfig) -> Self {
        Self {
            fetcher: TileFetcher::new(client, &config),
            layout,
            config,
        }
    }

    pub fn fetcher(&self) -> &TileFetcher<C> {
        &self.fetcher
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Fetches every identifier of the catalog.
    pub async fn run(&self, catalog: &Catalog) -> FetchSummary {
        let total = catalog.len();
        let interval = self.config.progress_interval();
        let mut summary = FetchSummary::default();

        info!(
            identifiers = total,
            tile_root = %self.layout.tile_root().display(),
            max_concurrency = self.config.max_concurrency(),
            "Starting fetch"
        );

        for (sub, records) in catalog.by_specimen() {
            let specimen_dir = self.layout.specimen_tile_dir(sub);
            if let Err(e) = tokio::fs::create_dir_all(&specimen_dir).await {
                let e = FetchError::CreateDir {
                    path: specimen_dir,
                    source: e,
                };
                error!(sub, error = %e, "Skipping specimen");
                summary
                    .aborted
                    .extend(records.iter().map(|r| r.identifier.clone()));
                continue;
            }

            for record in records {
                match self.fetch_record(record).await {
                    Ok(RecordFetch::Skipped) => summary.skipped += 1,
                    Ok(RecordFetch::Completed(report)) => {
                        summary.completed += 1;
                        summary.tiles.absorb(&report);
                    }
                    Err(e) => {
                        error!(
                            identifier = %record.identifier,
                            sub,
                            error = %e,
                            "Fetch failed; identifier left incomplete"
                        );
                        summary.aborted.push(record.identifier.clone());
                    }
                }

                let processed = summary.processed();
                if processed % interval == 0 {
                    info!(processed, total, "Fetch progress");
                }
            }
        }

        info!(
            completed = summary.completed,
            skipped = summary.skipped,
            aborted = summary.aborted.len(),
            downloaded = summary.tiles.downloaded,
            not_found = summary.tiles.not_found,
            "Fetch finished"
        );
        summary
    }

    /// Fetches one identifier unless its completion marker exists.
    pub async fn fetch_record(&self, record: &ImageRecord) -> FetchResult<RecordFetch> {
        let marker = self.layout.marker_path(record);
        if tokio::fs::try_exists(&marker).await.unwrap_or(false) {
            debug!(identifier = %record.identifier, "Already complete");
            return Ok(RecordFetch::Skipped);
        }

        let request = FetchRequest::for_record(record, &self.layout, &self.config);
        let report = self.fetcher.fetch(&request).await?;
        write_marker(&marker, record, &report).await?;

        debug!(identifier = %record.identifier, "Marked complete");
        Ok(RecordFetch::Completed(report))
    }
}

/// Writes the completion marker via a `.part` sibling and rename. Only its
/// presence is meaningful, so it must never appear half written.
async fn write_marker(path: &Path, record: &ImageRecord, report: &FetchReport) -> FetchResult<()> {
    let content = format!(
        "identifier: {}\ncompleted: {}\ntiles: {}\ndownloaded: {}\npresent: {}\nnot_found: {}\nfailed: {}\n",
        record.identifier,
        chrono::Local::now().to_rfc3339(),
        report.total,
        report.downloaded,
        report.present,
        report.not_found,
        report.failed,
    );

    let write_err = |e| FetchError::WriteMarker {
        path: path.to_path_buf(),
        source: e,
    };

    let mut temp = path.as_os_str().to_os_string();
    temp.push(".part");
    let temp = PathBuf::from(temp);

    tokio::fs::write(&temp, content).await.map_err(write_err)?;
    tokio::fs::rename(&temp, path).await.map_err(write_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{TileResponse, TransportError};
    use crate::grid::{tile_path, TileCoord};
    use crate::testing::{jpeg_tile, MockTileClient};
    use std::time::Duration;

    fn config() -> FetchConfig {
        FetchConfig::new()
            .with_retry_backoff(Duration::from_millis(1))
            .with_max_attempts(2)
    }

    fn catalog() -> Catalog {
        Catalog::new(vec![
            ImageRecord::new("0001", "714645", 300, 260, 1),
            ImageRecord::new("0002", "714645", 512, 256, 1),
            ImageRecord::new("0003", "514533", 256, 256, 2),
        ])
    }

    #[tokio::test]
    async fn test_run_fetches_and_marks() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path().join("tiles"), dir.path().join("images"));
        let client = Arc::new(MockTileClient::serving(200));
        let coordinator = FetchCoordinator::new(Arc::clone(&client), layout.clone(), config());

        let catalog = catalog();
        let summary = coordinator.run(&catalog).await;

        assert_eq!(summary.completed, 3);
        assert!(summary.is_clean());
        assert_eq!(summary.tiles.downloaded, 4 + 2 + 1);
        for record in catalog.records() {
            assert!(layout.marker_path(record).exists());
        }

        let marker = std::fs::read_to_string(layout.marker_path(&catalog.records()[0])).unwrap();
        assert!(marker.starts_with("identifier: 0001\n"));
        assert!(marker.contains("tiles: 4\n"));

        // Zoom is tier_count - 1.
        let third = layout.image_tile_dir(&catalog.records()[2]);
        assert!(tile_path(&third, TileCoord::new(1, 0, 0)).exists());
    }

    #[tokio::test]
    async fn test_marker_written_without_part_file() {
        let dir = tempfile::tempdir().unwrap();
        let record = ImageRecord::new("0001", "714645", 256, 256, 1);
        let path = dir.path().join("0001.txt");
        let report = FetchReport {
            total: 1,
            downloaded: 1,
            ..Default::default()
        };

        write_marker(&path, &record, &report).await.unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["0001.txt".to_string()]);
        assert!(std::fs::read_to_string(&path).unwrap().contains("downloaded: 1\n"));
    }

    #[tokio::test]
    async fn test_second_run_makes_no_requests() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path().join("tiles"), dir.path().join("images"));
        let catalog = catalog();

        let first = Arc::new(MockTileClient::serving(200));
        FetchCoordinator::new(first, layout.clone(), config())
            .run(&catalog)
            .await;

        let second = Arc::new(MockTileClient::serving(200));
        let summary = FetchCoordinator::new(Arc::clone(&second), layout, config())
            .run(&catalog)
            .await;

        assert_eq!(summary.skipped, 3);
        assert_eq!(second.request_count(), 0);
    }

    #[tokio::test]
    async fn test_resumes_partial_identifier() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path().join("tiles"), dir.path().join("images"));
        let record = ImageRecord::new("0009", "714645", 256 * 5, 256, 1);
        let image_dir = layout.image_tile_dir(&record);
        std::fs::create_dir_all(&image_dir).unwrap();
        for x in 0..3 {
            std::fs::write(
                tile_path(&image_dir, TileCoord::new(0, x, 0)),
                jpeg_tile(90, 256, 256),
            )
            .unwrap();
        }

        let client = Arc::new(MockTileClient::serving(200));
        let coordinator = FetchCoordinator::new(Arc::clone(&client), layout.clone(), config());
        let outcome = coordinator.fetch_record(&record).await.unwrap();

        assert!(matches!(outcome, RecordFetch::Completed(r) if r.present == 3 && r.downloaded == 2));
        assert_eq!(client.requested_tiles(), vec!["0-3-0.jpg", "0-4-0.jpg"]);
        assert!(layout.marker_path(&record).exists());
    }

    #[tokio::test]
    async fn test_aborted_identifier_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path().join("tiles"), dir.path().join("images"));
        let refused = || Err(TransportError::Connect("refused".into()));

        // 0001's first tile fails; every other tile succeeds. URLs differ per
        // identifier but the scripted tile name is shared, so script only the
        // first two replies, which 0001 consumes.
        let client = Arc::new(
            MockTileClient::serving(200).script("0-0-0.jpg", vec![refused(), refused()]),
        );
        let coordinator = FetchCoordinator::new(
            Arc::clone(&client),
            layout.clone(),
            config().with_max_concurrency(1),
        );

        let catalog = Catalog::new(vec![
            ImageRecord::new("0001", "714645", 256, 256, 1),
            ImageRecord::new("0002", "714645", 256, 256, 1),
        ]);
        let summary = coordinator.run(&catalog).await;

        assert_eq!(summary.aborted, vec!["0001".to_string()]);
        assert_eq!(summary.completed, 1);
        assert!(!layout.marker_path(&catalog.records()[0]).exists());
        assert!(layout.marker_path(&catalog.records()[1]).exists());
    }

    #[tokio::test]
    async fn test_not_found_tiles_still_complete() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path().join("tiles"), dir.path().join("images"));
        let client = Arc::new(
            MockTileClient::serving(200).script("0-1-0.jpg", vec![Ok(TileResponse::not_found())]),
        );
        let coordinator = FetchCoordinator::new(client, layout.clone(), config());

        let record = ImageRecord::new("0001", "714645", 512, 256, 1);
        let outcome = coordinator.fetch_record(&record).await.unwrap();

        assert!(matches!(outcome, RecordFetch::Completed(r) if r.not_found == 1));
        assert!(layout.marker_path(&record).exists());
    }
}
