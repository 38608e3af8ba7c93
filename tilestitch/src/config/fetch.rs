//! Tile fetch configuration.

use std::time::Duration;

use super::file::{
    DEFAULT_BASE_URL, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_CONCURRENCY, DEFAULT_PROGRESS_INTERVAL,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_RETRY_BACKOFF_SECS,
};
use crate::fetch::{EscalationPolicy, RetryPolicy};
use crate::grid::GridShape;

/// Configuration for fetching the tiles of a catalog.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use tilestitch::config::FetchConfig;
///
/// let config = FetchConfig::new()
///     .with_max_concurrency(32)
///     .with_retry_backoff(Duration::from_secs(5));
/// assert_eq!(config.max_concurrency(), 32);
/// assert_eq!(config.max_attempts(), 5);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FetchConfig {
    /// Service base URL, including the trailing slash
    base_url: String,
    /// Per-request timeout
    request_timeout: Duration,
    /// Maximum in-flight requests per identifier
    max_concurrency: usize,
    /// Attempts per tile
    max_attempts: u32,
    /// Fixed sleep after a connection failure
    retry_backoff: Duration,
    /// What to do when a tile exhausts its attempts
    escalation: EscalationPolicy,
    /// Identifiers between progress log lines
    progress_interval: usize,
    grid_shape: GridShape,
}

impl FetchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the in-flight request bound. Values below 1 are raised to 1.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Set the attempts per tile. Values below 1 are raised to 1.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn with_escalation(mut self, escalation: EscalationPolicy) -> Self {
        self.escalation = escalation;
        self
    }

    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval.max(1);
        self
    }

    pub fn with_grid_shape(mut self, shape: GridShape) -> Self {
        self.grid_shape = shape;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn retry_backoff(&self) -> Duration {
        self.retry_backoff
    }

    pub fn escalation(&self) -> EscalationPolicy {
        self.escalation
    }

    pub fn progress_interval(&self) -> usize {
        self.progress_interval
    }

    pub fn grid_shape(&self) -> GridShape {
        self.grid_shape
    }

    /// Retry policy derived from the attempt limit and backoff.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.retry_backoff)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_backoff: Duration::from_secs(DEFAULT_RETRY_BACKOFF_SECS),
            escalation: EscalationPolicy::default(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            grid_shape: GridShape::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FetchConfig::default();
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.max_concurrency(), 300);
        assert_eq!(config.max_attempts(), 5);
        assert_eq!(config.retry_backoff(), Duration::from_secs(60));
        assert_eq!(config.escalation(), EscalationPolicy::AbortIdentifier);
        assert_eq!(config.grid_shape(), GridShape::Independent);
    }

    #[test]
    fn test_new_equals_default() {
        assert_eq!(FetchConfig::new(), FetchConfig::default());
    }

    #[test]
    fn test_lower_bounds() {
        let config = FetchConfig::new()
            .with_max_concurrency(0)
            .with_max_attempts(0)
            .with_progress_interval(0);
        assert_eq!(config.max_concurrency(), 1);
        assert_eq!(config.max_attempts(), 1);
        assert_eq!(config.progress_interval(), 1);
    }

    #[test]
    fn test_retry_policy() {
        let policy = FetchConfig::new()
            .with_max_attempts(3)
            .with_retry_backoff(Duration::from_millis(10))
            .retry_policy();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.backoff(), Duration::from_millis(10));
    }
}
