//! Throttling primitives for provider-facing work.
//!
//! [`RateLimiter`] is the process-wide gate in front of every provider
//! request: a concurrency cap plus minimum spacing between request
//! starts, with a bounded queue and overload rejection.
//! [`ConcurrencyLimiter`] is the per-batch gate that bounds how wide one
//! logical operation may fan out, independent of the provider limiter.

mod concurrency;
mod config;
mod limiter;

pub use concurrency::ConcurrencyLimiter;
pub use config::{
    RateLimitConfig, DEFAULT_MAX_CONCURRENT, DEFAULT_QUEUE_LIMIT, DEFAULT_REQUESTS_PER_SECOND,
};
pub use limiter::{RateLimitPermit, RateLimiter};
