//! Tile fetcher for one identifier.
//!
//! Every tile of the grid that is not already on disk becomes a task in a
//! `JoinSet`. Tasks share nothing but the filesystem and the request limiter.
//! A tile that exhausts its attempts is reported back; the escalation policy
//! decides whether that cancels the identifier's remaining tiles.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::client::TileClient;
use super::error::{FetchError, FetchResult, TileFailure};
use super::limiter::ConcurrencyLimiter;
use super::policy::{classify, Attempt, EscalationPolicy, RetryPolicy};
use crate::catalog::ImageRecord;
use crate::config::FetchConfig;
use crate::grid::{tile_path, TileAddress, TileCoord, TileGrid};
use crate::layout::StorageLayout;

/// Everything needed to fetch one identifier's tiles.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub identifier: String,
    pub grid: TileGrid,
    pub address: TileAddress,
    pub image_dir: PathBuf,
}

impl FetchRequest {
    pub fn new(
        identifier: impl Into<String>,
        grid: TileGrid,
        address: TileAddress,
        image_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            grid,
            address,
            image_dir: image_dir.into(),
        }
    }

    /// Request for a catalog record under the given layout.
    pub fn for_record(record: &ImageRecord, layout: &StorageLayout, config: &FetchConfig) -> Self {
        Self::new(
            record.identifier.clone(),
            record.grid(config.grid_shape()),
            record.tile_address(config.base_url()),
            layout.image_tile_dir(record),
        )
    }
}

/// Tile counts of one identifier's fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchReport {
    /// Tiles in the grid.
    pub total: usize,
    /// Already on disk, not requested.
    pub present: usize,
    pub downloaded: usize,
    /// 404 holes.
    pub not_found: usize,
    /// Exhausted tiles tolerated by the escalation policy.
    pub failed: usize,
}

impl FetchReport {
    /// Adds another report's counts to this one.
    pub fn absorb(&mut self, other: &FetchReport) {
        self.total += other.total;
        self.present += other.present;
        self.downloaded += other.downloaded;
        self.not_found += other.not_found;
        self.failed += other.failed;
    }
}

/// How one tile task ended.
#[derive(Debug)]
enum TileOutcome {
    Downloaded,
    NotFound,
    Exhausted {
        url: String,
        attempts: u32,
        failure: TileFailure,
    },
    Cancelled,
}

/// Fetches the tile grid of one identifier at a time.
pub struct TileFetcher<C> {
    client: Arc<C>,
    limiter: Arc<ConcurrencyLimiter>,
    retry: RetryPolicy,
    escalation: EscalationPolicy,
}

impl<C> TileFetcher<C>
where
    C: TileClient + 'static,
{
    pub fn new(client: Arc<C>, config: &FetchConfig) -> Self {
        Self {
            client,
            limiter: Arc::new(ConcurrencyLimiter::new(config.max_concurrency())),
            retry: config.retry_policy(),
            escalation: config.escalation(),
        }
    }

    pub fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }

    /// Fetches every missing tile of the request's grid.
    ///
    /// Returns `Ok` when the grid loop finished without escalation; the
    /// caller may then mark the identifier complete. On escalation, tiles
    /// already written stay on disk and untouched tiles are never requested.
    pub async fn fetch(&self, request: &FetchRequest) -> FetchResult<FetchReport> {
        tokio::fs::create_dir_all(&request.image_dir)
            .await
            .map_err(|e| FetchError::CreateDir {
                path: request.image_dir.clone(),
                source: e,
            })?;

        let mut report = FetchReport {
            total: request.grid.len(),
            ..FetchReport::default()
        };
        let cancel = CancellationToken::new();
        let mut tasks = JoinSet::new();

        for coord in request.grid.coords() {
            let path = tile_path(&request.image_dir, coord);
            if tile_exists(&path).await {
                report.present += 1;
                continue;
            }

            tasks.spawn(fetch_tile(
                Arc::clone(&self.client),
                Arc::clone(&self.limiter),
                self.retry,
                request.address.url(coord),
                coord,
                path,
                cancel.clone(),
            ));
        }

        debug!(
            identifier = %request.identifier,
            total = report.total,
            present = report.present,
            queued = tasks.len(),
            "Fetching tiles"
        );

        let mut fatal: Option<FetchError> = None;
        let mut cancelled = 0usize;

        while let Some(joined) = tasks.join_next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => Err(FetchError::TaskFailed(e.to_string())),
            };

            match outcome {
                Ok(TileOutcome::Downloaded) => report.downloaded += 1,
                Ok(TileOutcome::NotFound) => report.not_found += 1,
                Ok(TileOutcome::Cancelled) => cancelled += 1,
                Ok(TileOutcome::Exhausted {
                    url,
                    attempts,
                    failure,
                }) => {
                    report.failed += 1;
                    warn!(
                        identifier = %request.identifier,
                        url = %url,
                        attempts,
                        error = %failure,
                        "Tile exhausted its attempts"
                    );
                    if fatal.is_none() && self.escalation.should_abort(report.failed) {
                        cancel.cancel();
                        fatal = Some(FetchError::Aborted {
                            identifier: request.identifier.clone(),
                            failed_tiles: report.failed,
                            url,
                            attempts,
                            failure,
                        });
                    }
                }
                Err(e) => {
                    if fatal.is_none() {
                        cancel.cancel();
                        fatal = Some(e);
                    }
                }
            }
        }

        if let Some(e) = fatal {
            warn!(
                identifier = %request.identifier,
                downloaded = report.downloaded,
                cancelled,
                "Fetch aborted"
            );
            return Err(e);
        }

        debug!(
            identifier = %request.identifier,
            downloaded = report.downloaded,
            not_found = report.not_found,
            failed = report.failed,
            peak_in_flight = self.limiter.peak_in_flight(),
            "Fetch complete"
        );
        Ok(report)
    }
}

async fn tile_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// Fetches one tile with retries.
///
/// The limiter permit is held for the HTTP exchange only.
async fn fetch_tile<C: TileClient>(
    client: Arc<C>,
    limiter: Arc<ConcurrencyLimiter>,
    retry: RetryPolicy,
    url: String,
    coord: TileCoord,
    path: PathBuf,
    cancel: CancellationToken,
) -> FetchResult<TileOutcome> {
    let mut last_failure = TileFailure::EmptyBody;

    for attempt in 1..=retry.max_attempts() {
        let result = {
            let permit = tokio::select! {
                _ = cancel.cancelled() => return Ok(TileOutcome::Cancelled),
                permit = limiter.acquire() => permit,
            };
            let Some(_permit) = permit else {
                return Ok(TileOutcome::Cancelled);
            };

            tokio::select! {
                _ = cancel.cancelled() => return Ok(TileOutcome::Cancelled),
                result = client.get(&url) => result,
            }
        };

        match classify(result) {
            Attempt::Store(body) => {
                write_tile(path, body).await?;
                debug!(tile = %coord, attempt, "Tile stored");
                return Ok(TileOutcome::Downloaded);
            }
            Attempt::NotFound => {
                info!(url = %url, "Tile not found");
                return Ok(TileOutcome::NotFound);
            }
            Attempt::Retry(failure) => {
                debug!(url = %url, attempt, error = %failure, "Retrying tile");
                last_failure = failure;
            }
            Attempt::Backoff(failure) => {
                warn!(
                    url = %url,
                    attempt,
                    backoff_secs = retry.backoff().as_secs(),
                    error = %failure,
                    "Connection failed"
                );
                last_failure = failure;
                if retry.has_next(attempt) {
                    tokio::select! {
                        _ = cancel.cancelled() => return Ok(TileOutcome::Cancelled),
                        _ = tokio::time::sleep(retry.backoff()) => {}
                    }
                }
            }
        }
    }

    Ok(TileOutcome::Exhausted {
        url,
        attempts: retry.max_attempts(),
        failure: last_failure,
    })
}

/// Writes a tile via a `.part` sibling and rename, so a tile path only ever
/// holds a complete body.
async fn write_tile(path: PathBuf, body: Vec<u8>) -> FetchResult<()> {
    let target = path.clone();
    tokio::task::spawn_blocking(move || {
        let mut temp = target.clone().into_os_string();
        temp.push(".part");
        let temp = PathBuf::from(temp);

        std::fs::write(&temp, &body)?;
        std::fs::rename(&temp, &target)
    })
    .await
    .map_err(|e| FetchError::WriteTile {
        path: path.clone(),
        source: std::io::Error::other(e.to_string()),
    })?
    .map_err(|e| FetchError::WriteTile { path, source: e })
}
