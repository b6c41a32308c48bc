use std::num::NonZeroU32;
use std::time::Duration;

/// Default number of provider requests allowed in flight at once
pub const DEFAULT_MAX_CONCURRENT: usize = 2;
/// Default provider request rate, requests per second
pub const DEFAULT_REQUESTS_PER_SECOND: u32 = 3;
/// Default bound on the number of queued provider requests
pub const DEFAULT_QUEUE_LIMIT: usize = 120;

/// Sizing and pacing knobs for a [`RateLimiter`](super::RateLimiter)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum number of operations running at once, at least 1
    pub max_concurrent: usize,
    /// Minimum time between two operation starts
    pub min_interval: Duration,
    /// Queue bound; `None` means unbounded
    pub max_queue_size: Option<usize>,
}

impl RateLimitConfig {
    /// Create a config with an explicit spacing interval
    #[must_use]
    pub fn new(max_concurrent: usize, min_interval: Duration, max_queue_size: Option<usize>) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
            min_interval,
            max_queue_size,
        }
    }

    /// Derive the spacing interval from a target request rate.
    ///
    /// The interval is rounded up so the limiter never exceeds the target
    /// rate: 3 requests per second becomes a 334ms spacing.
    #[must_use]
    pub fn per_second(
        max_concurrent: usize,
        requests_per_second: NonZeroU32,
        max_queue_size: Option<usize>,
    ) -> Self {
        let millis = 1000u64.div_ceil(u64::from(requests_per_second.get()));
        Self::new(max_concurrent, Duration::from_millis(millis), max_queue_size)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        let rate = NonZeroU32::new(DEFAULT_REQUESTS_PER_SECOND).expect("non-zero default rate");
        Self::per_second(DEFAULT_MAX_CONCURRENT, rate, Some(DEFAULT_QUEUE_LIMIT))
    }
}
