use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::{ErrorKind, Result};

/// An asynchronous gate enforcing only "at most K operations in flight".
///
/// Unlike [`RateLimiter`](super::RateLimiter) there is no spacing and no
/// queue bound; callers are expected to size their own fan-out. Built on
/// tokio's fair semaphore, so waiters are served in submission order.
///
/// One instance is meant to be created per logical batch (a `compare`
/// call, a batch resolve) and dropped with it, so one batch's fan-out
/// width never interferes with another's.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    permits: Arc<Semaphore>,
}

impl ConcurrencyLimiter {
    /// Create a limiter allowing `max_concurrent` operations at once
    #[must_use]
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Run `op` once a slot is free, holding the slot until it settles
    pub async fn run<T, F>(&self, op: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| ErrorKind::LimiterClosed)?;
        op.await
    }
}
