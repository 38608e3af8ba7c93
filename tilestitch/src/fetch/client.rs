//! HTTP client abstraction for testability.

use std::future::Future;
use std::time::Duration;

use tracing::trace;

use super::error::{FetchError, TransportError};

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl TileResponse {
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        Self { status, body }
    }

    /// 200 with the given body.
    pub fn ok(body: Vec<u8>) -> Self {
        Self::new(200, body)
    }

    pub fn not_found() -> Self {
        Self::new(404, Vec::new())
    }
}

/// Trait for asynchronous tile requests.
///
/// Any HTTP status is a successful exchange; only failures to get a response
/// at all are errors. This lets the fetcher apply its own status policy and
/// lets tests inject scripted clients.
pub trait TileClient: Send + Sync {
    /// Performs an HTTP GET request.
    fn get(&self, url: &str) -> impl Future<Output = Result<TileResponse, TransportError>> + Send;
}

/// Real tile client using reqwest.
///
/// The underlying client pools connections, so one instance serves a whole
/// batch run.
#[derive(Clone)]
pub struct ReqwestTileClient {
    client: reqwest::Client,
}

impl ReqwestTileClient {
    /// Creates a client with the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::ClientBuild(e.to_string()))?;

        Ok(Self { client })
    }
}

impl TileClient for ReqwestTileClient {
    async fn get(&self, url: &str) -> Result<TileResponse, TransportError> {
        trace!(url, "GET");
        let response = self.client.get(url).send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(classify)?;

        Ok(TileResponse::new(status, body.to_vec()))
    }
}

fn classify(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(error.to_string())
    } else if error.is_connect() {
        TransportError::Connect(error.to_string())
    } else {
        TransportError::Other(error.to_string())
    }
}
