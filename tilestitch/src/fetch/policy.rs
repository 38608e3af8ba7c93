//! Retry and escalation policies for tile fetching.
//!
//! - [`RetryPolicy`]: how one tile handles transient failures
//! - [`EscalationPolicy`]: how an identifier reacts to tiles that exhausted
//!   their attempts
//! - [`classify`]: what a single HTTP exchange means for its tile

use std::time::Duration;

use super::client::TileResponse;
use super::error::{TileFailure, TransportError};

/// Bounded retries with a fixed backoff.
///
/// The backoff applies after connection-level failures only; bad statuses
/// and empty bodies are retried immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
}

impl RetryPolicy {
    /// Creates a policy. At least one attempt is always made.
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    /// Whether another attempt follows attempt number `attempt` (1-based).
    pub fn has_next(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// What happens when a tile exhausts its attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EscalationPolicy {
    /// The first exhausted tile aborts the identifier; remaining tiles are
    /// cancelled and no completion marker is written.
    #[default]
    AbortIdentifier,

    /// Up to `max_failed_tiles` exhausted tiles are left as holes; one more
    /// aborts the identifier.
    Tolerate { max_failed_tiles: usize },
}

impl EscalationPolicy {
    /// Policy for a tolerance threshold; 0 aborts on the first failure.
    pub fn from_threshold(max_failed_tiles: usize) -> Self {
        if max_failed_tiles == 0 {
            EscalationPolicy::AbortIdentifier
        } else {
            EscalationPolicy::Tolerate { max_failed_tiles }
        }
    }

    /// Whether `failed_tiles` exhausted tiles abort the identifier.
    pub fn should_abort(&self, failed_tiles: usize) -> bool {
        match self {
            EscalationPolicy::AbortIdentifier => failed_tiles > 0,
            EscalationPolicy::Tolerate { max_failed_tiles } => failed_tiles > *max_failed_tiles,
        }
    }
}

/// Meaning of one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt {
    /// 200 with a body: persist it.
    Store(Vec<u8>),
    /// 404: permanent hole.
    NotFound,
    /// Bad status or empty body: retry at once.
    Retry(TileFailure),
    /// No response: sleep the backoff, then retry.
    Backoff(TileFailure),
}

/// Classifies the result of one HTTP exchange.
pub fn classify(result: Result<TileResponse, TransportError>) -> Attempt {
    match result {
        Ok(TileResponse { status: 200, body }) if !body.is_empty() => Attempt::Store(body),
        Ok(TileResponse { status: 200, .. }) => Attempt::Retry(TileFailure::EmptyBody),
        Ok(TileResponse { status: 404, .. }) => Attempt::NotFound,
        Ok(TileResponse { status, .. }) => Attempt::Retry(TileFailure::Status(status)),
        Err(e) => Attempt::Backoff(TileFailure::Transport(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_policy_attempts() {
        let policy = RetryPolicy::new(3, Duration::from_secs(60));
        assert!(policy.has_next(1));
        assert!(policy.has_next(2));
        assert!(!policy.has_next(3));

        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts(), 1);
    }

    #[test]
    fn test_escalation_threshold() {
        let abort = EscalationPolicy::from_threshold(0);
        assert_eq!(abort, EscalationPolicy::AbortIdentifier);
        assert!(!abort.should_abort(0));
        assert!(abort.should_abort(1));

        let tolerate = EscalationPolicy::from_threshold(2);
        assert!(!tolerate.should_abort(2));
        assert!(tolerate.should_abort(3));
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            classify(Ok(TileResponse::ok(vec![0xFF, 0xD8]))),
            Attempt::Store(vec![0xFF, 0xD8])
        );
        assert_eq!(classify(Ok(TileResponse::not_found())), Attempt::NotFound);
        assert_eq!(
            classify(Ok(TileResponse::ok(Vec::new()))),
            Attempt::Retry(TileFailure::EmptyBody)
        );
        assert_eq!(
            classify(Ok(TileResponse::new(503, b"busy".to_vec()))),
            Attempt::Retry(TileFailure::Status(503))
        );
        assert!(matches!(
            classify(Err(TransportError::Connect("refused".into()))),
            Attempt::Backoff(_)
        ));
    }
}
