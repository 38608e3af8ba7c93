//! Shared fixtures for unit tests.

use std::collections::{HashMap, VecDeque};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use image::{GrayImage, ImageFormat, Luma};

use crate::fetch::{TileClient, TileResponse, TransportError};

/// JPEG bytes of a uniform grey tile.
pub(crate) fn jpeg_tile(value: u8, width: u32, height: u32) -> Vec<u8> {
    let img = GrayImage::from_pixel(width, height, Luma([value]));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
        .unwrap();
    buf
}

type Reply = Result<TileResponse, TransportError>;

/// Scripted tile client.
///
/// Replies are scripted per tile file name (`{zoom}-{x}-{y}.jpg`); tiles
/// without a script, or whose script ran out, get the fallback reply.
pub(crate) struct MockTileClient {
    fallback: Reply,
    scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
    requests: Mutex<Vec<String>>,
    delay: Duration,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockTileClient {
    pub(crate) fn new(fallback: Reply) -> Self {
        Self {
            fallback,
            scripts: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Serves a uniform 256×256 tile for every request.
    pub(crate) fn serving(value: u8) -> Self {
        Self::new(Ok(TileResponse::ok(jpeg_tile(value, 256, 256))))
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn script(self, tile: &str, replies: Vec<Reply>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(tile.to_string(), replies.into());
        self
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub(crate) fn requests_for(&self, tile: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|url| tile_name(url) == tile)
            .count()
    }

    pub(crate) fn requested_tiles(&self) -> Vec<String> {
        let mut tiles: Vec<String> = self
            .requests
            .lock()
            .unwrap()
            .iter()
            .map(|url| tile_name(url).to_string())
            .collect();
        tiles.sort();
        tiles.dedup();
        tiles
    }

    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

impl TileClient for MockTileClient {
    async fn get(&self, url: &str) -> Result<TileResponse, TransportError> {
        self.requests.lock().unwrap().push(url.to_string());
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let reply = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(tile_name(url))
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| self.fallback.clone());

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        reply
    }
}

/// `{zoom}-{x}-{y}.jpg` part of a tile URL.
fn tile_name(url: &str) -> &str {
    let start = url.rfind('/').map(|i| i + 1).unwrap_or(0);
    let end = url.find('?').unwrap_or(url.len());
    &url[start..end]
}
