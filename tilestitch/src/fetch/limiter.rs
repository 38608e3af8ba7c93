//! Concurrency limiter for tile requests.
//!
//! A semaphore caps the number of requests in flight for one identifier
//! (default 300). A permit is held for the duration of one HTTP exchange only,
//! never across a retry backoff or the disk write that follows.
//!
//! ```ignore
//! let limiter = Arc::new(ConcurrencyLimiter::new(300));
//! if let Some(_permit) = limiter.acquire().await {
//!     // HTTP request happens here...
//! }
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Limiter for in-flight tile requests.
#[derive(Debug)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,

    /// Maximum permits (for stats/debugging)
    max_permits: usize,

    /// Current number of in-flight requests
    in_flight: AtomicUsize,

    /// Peak concurrent requests observed
    peak_in_flight: AtomicUsize,
}

impl ConcurrencyLimiter {
    /// Creates a limiter. A bound of 0 is raised to 1.
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_permits: max_concurrent,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Waits for a permit.
    ///
    /// Returns `None` only once the limiter has been closed.
    pub async fn acquire(&self) -> Option<RequestPermit<'_>> {
        let permit = self.semaphore.clone().acquire_owned().await.ok()?;

        let current = self.in_flight.fetch_add(1, Ordering::Relaxed) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::Relaxed);

        Some(RequestPermit {
            _permit: permit,
            in_flight: &self.in_flight,
        })
    }

    /// Closes the limiter; pending and future `acquire` calls return `None`.
    pub fn close(&self) {
        self.semaphore.close();
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_permits
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Peak number of concurrent requests since creation or the last reset.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::Relaxed)
    }

    pub fn reset_peak(&self) {
        self.peak_in_flight.store(0, Ordering::Relaxed);
    }
}

/// Permit for one HTTP request, released on drop.
pub struct RequestPermit<'a> {
    _permit: OwnedSemaphorePermit,
    in_flight: &'a AtomicUsize,
}

impl Drop for RequestPermit<'_> {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}
