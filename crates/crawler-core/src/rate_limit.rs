//! Request pacing.
//!
//! tibia.com answers 403 to clients that request too often. A [`RateLimiter`]
//! is awaited before every request attempt; callers share one limiter across
//! parsers to pace all traffic to the origin.

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovRateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

/// Interval known not to be restricted by tibia.com for non-whitelisted IPs.
pub const DEFAULT_RATE_LIMIT_INTERVAL: Duration = Duration::from_millis(750);

/// Gate awaited before each request.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Wait until the next request is admitted.
    async fn take(&self);
}

/// Admits one request per interval.
///
/// Backed by a single-cell GCRA quota: the first call returns immediately,
/// every later admission comes at least `interval` after the previous one, and
/// idle time does not build up a burst.
pub struct PacedRateLimiter {
    interval: Duration,
    limiter: GovRateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl PacedRateLimiter {
    /// Create a limiter admitting one request per `interval`.
    ///
    /// A zero interval admits every request immediately.
    pub fn new(interval: Duration) -> Self {
        let quota = Quota::with_period(interval)
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MAX));
        Self {
            interval,
            limiter: GovRateLimiter::direct(quota),
        }
    }

    /// Configured spacing between admissions.
    pub const fn interval(&self) -> Duration {
        self.interval
    }
}

impl std::fmt::Debug for PacedRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacedRateLimiter")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RateLimiter for PacedRateLimiter {
    async fn take(&self) {
        self.limiter.until_ready().await;
    }
}

/// A limiter pacing requests at [`DEFAULT_RATE_LIMIT_INTERVAL`].
///
/// Users that are not behind a proxy should pass this limiter, shared, to
/// every parser.
pub fn default_rate_limiter() -> Arc<PacedRateLimiter> {
    Arc::new(PacedRateLimiter::new(DEFAULT_RATE_LIMIT_INTERVAL))
}
