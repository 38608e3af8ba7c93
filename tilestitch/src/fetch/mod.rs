//! Resumable tile download.
//!
//! [`TileFetcher`] downloads the missing tiles of one identifier with bounded
//! concurrency and per-tile retry. [`FetchCoordinator`] drives it over a
//! whole catalog and maintains completion markers.
//!
//! # Status handling
//!
//! | Response                      | Action                          |
//! |-------------------------------|---------------------------------|
//! | 200, non-empty body           | write tile atomically           |
//! | 404                           | permanent hole, no retry        |
//! | 200 empty body / other status | retry immediately               |
//! | no response                   | sleep the fixed backoff, retry  |
//!
//! A tile that exhausts its attempts is handed to the [`EscalationPolicy`].

mod client;
mod coordinator;
mod error;
mod fetcher;
mod limiter;
mod policy;

pub use client::{ReqwestTileClient, TileClient, TileResponse};
pub use coordinator::{FetchCoordinator, FetchSummary, RecordFetch};
pub use error::{FetchError, FetchResult, TileFailure, TransportError};
pub use fetcher::{FetchReport, FetchRequest, TileFetcher};
pub use limiter::{ConcurrencyLimiter, RequestPermit};
pub use policy::{classify, Attempt, EscalationPolicy, RetryPolicy};
