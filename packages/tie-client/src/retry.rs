//! Retry policy and the sleep seam used by the page cursor.

use std::time::Duration;

use async_trait::async_trait;

/// Attempts per page, including the first one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Wait before the first retry; doubled for each further retry.
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_secs(5);

/// Courtesy delay before the first request of every query.
pub const DEFAULT_PACING: Duration = Duration::from_millis(100);

/// Bounded exponential backoff for server errors.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub pacing: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            pacing: DEFAULT_PACING,
        }
    }
}

impl RetryPolicy {
    /// Wait before retry number `retry` (zero-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        self.initial_backoff.saturating_mul(1u32 << retry.min(16))
    }
}

/// Sleep abstraction so retry loops can be tested without real delays.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
