use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::ratelimit::RateLimitConfig;
use crate::{ErrorKind, Result};

/// An asynchronous gate enforcing "at most K operations in flight" and
/// "at least T between operation starts", with a bounded FIFO queue.
///
/// Operations start in submission order; the spacing constraint applies
/// to the limiter as a whole, so a head-of-queue operation waiting out
/// the interval blocks everything behind it. When the queue is full, a
/// submission that cannot start immediately is rejected with
/// [`ErrorKind::Overloaded`] instead of being queued.
///
/// Cloning is cheap and clones share one limiter. One instance is meant
/// to be created at process start and shared by every provider call, so
/// the aggregate request rate stays within the provider's limit no
/// matter how many batches run concurrently.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    config: RateLimitConfig,
    state: Mutex<State>,
}

#[derive(Debug)]
struct State {
    active: usize,
    last_start: Option<Instant>,
    queue: VecDeque<oneshot::Sender<RateLimitPermit>>,
    /// Whether a spacing wake-up is already scheduled
    timer_armed: bool,
}

/// Permission to run one operation. Dropping the permit frees the slot
/// and wakes the dispatch loop.
#[derive(Debug)]
pub struct RateLimitPermit {
    limiter: Option<RateLimiter>,
}

impl RateLimitPermit {
    /// Neutralize the permit without releasing a slot. Used when a
    /// permit could not be handed to its waiter.
    fn disarm(mut self) {
        self.limiter.take();
    }
}

impl Drop for RateLimitPermit {
    fn drop(&mut self) {
        if let Some(limiter) = self.limiter.take() {
            limiter.release();
        }
    }
}

impl RateLimiter {
    /// Create a limiter from the given configuration
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(State {
                    active: 0,
                    last_start: None,
                    queue: VecDeque::new(),
                    timer_armed: false,
                }),
            }),
        }
    }

    /// Wait for a slot, respecting concurrency, spacing, and queue bound.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::Overloaded`] when the queue is at capacity and the
    /// operation would have to wait.
    pub async fn acquire(&self) -> Result<RateLimitPermit> {
        let receiver = {
            let mut state = self.state();
            if let Some(capacity) = self.inner.config.max_queue_size {
                let can_start_now = state.active < self.inner.config.max_concurrent
                    && state.queue.is_empty()
                    && self.spacing_elapsed(&state, Instant::now());
                if state.queue.len() >= capacity && !can_start_now {
                    log::warn!("rate limiter queue is full ({capacity}), rejecting submission");
                    return Err(ErrorKind::Overloaded(capacity));
                }
            }
            let (tx, rx) = oneshot::channel();
            state.queue.push_back(tx);
            rx
        };
        self.dispatch();
        receiver.await.map_err(|_| ErrorKind::LimiterClosed)
    }

    /// Run `op` under the limiter, holding its slot until `op` settles
    pub async fn run<T, F>(&self, op: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let _permit = self.acquire().await?;
        op.await
    }

    /// Number of operations currently holding a slot
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.state().active
    }

    /// Number of operations waiting for a slot
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.state().queue.len()
    }

    /// Start as many queued operations as the constraints allow.
    ///
    /// Triggered on submission, on permit release, and from the spacing
    /// timer. All state mutation happens under the mutex; nothing is
    /// awaited while it is held.
    fn dispatch(&self) {
        let mut state = self.state();
        loop {
            if state.active >= self.inner.config.max_concurrent {
                return;
            }
            // Entries whose caller gave up while queued never started,
            // so they are skipped without touching the bookkeeping.
            while state.queue.front().is_some_and(oneshot::Sender::is_closed) {
                state.queue.pop_front();
            }
            let Some(tx) = state.queue.pop_front() else {
                return;
            };
            let now = Instant::now();
            if let Some(last) = state.last_start {
                let wait = self
                    .inner
                    .config
                    .min_interval
                    .saturating_sub(now.duration_since(last));
                if !wait.is_zero() {
                    // Strict FIFO: the head goes back and nothing else
                    // may start before it does.
                    state.queue.push_front(tx);
                    self.arm_timer(&mut state, wait);
                    return;
                }
            }
            let previous_start = state.last_start.replace(now);
            state.active += 1;
            let permit = RateLimitPermit {
                limiter: Some(self.clone()),
            };
            if let Err(permit) = tx.send(permit) {
                // The caller vanished between the closed-check and the
                // send; it never started.
                permit.disarm();
                state.active -= 1;
                state.last_start = previous_start;
            }
        }
    }

    /// Schedule a dispatch retry once the remaining spacing has elapsed
    fn arm_timer(&self, state: &mut State, wait: Duration) {
        if state.timer_armed {
            return;
        }
        state.timer_armed = true;
        let limiter = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            limiter.state().timer_armed = false;
            limiter.dispatch();
        });
    }

    fn spacing_elapsed(&self, state: &State, now: Instant) -> bool {
        match state.last_start {
            None => true,
            Some(last) => now.duration_since(last) >= self.inner.config.min_interval,
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self) {
        self.state().active -= 1;
        self.dispatch();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use futures::future::join_all;
    use tokio::sync::oneshot;
    use tokio::time::Instant;

    use super::{RateLimitConfig, RateLimiter};
    use crate::ErrorKind;

    fn limiter(max_concurrent: usize, interval_ms: u64, queue: Option<usize>) -> RateLimiter {
        RateLimiter::new(RateLimitConfig::new(
            max_concurrent,
            Duration::from_millis(interval_ms),
            queue,
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_bound() {
        let limiter = limiter(3, 0, None);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let ops = (0..10).map(|_| {
            let limiter = limiter.clone();
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            tokio::spawn(async move {
                limiter
                    .run(async {
                        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        running.fetch_sub(1, Ordering::SeqCst);
                        Ok::<(), ErrorKind>(())
                    })
                    .await
            })
        });
        for result in join_all(ops).await {
            result.unwrap().unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(limiter.active_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spacing_between_starts() {
        let limiter = limiter(5, 100, None);
        let starts = Arc::new(std::sync::Mutex::new(Vec::new()));

        let ops = (0..4).map(|_| {
            let starts = Arc::clone(&starts);
            limiter.run(async move {
                starts.lock().unwrap().push(Instant::now());
                Ok::<(), ErrorKind>(())
            })
        });
        for result in join_all(ops).await {
            result.unwrap();
        }

        let starts = starts.lock().unwrap();
        assert_eq!(starts.len(), 4);
        for pair in starts.windows(2) {
            assert!(pair[1].duration_since(pair[0]) >= Duration::from_millis(100));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fifo_order() {
        let limiter = limiter(1, 0, None);
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        // join_all polls in submission order, so a/b/c enqueue in order
        let ops = ["a", "b", "c"].map(|name| {
            let order = Arc::clone(&order);
            limiter.run(async move {
                order.lock().unwrap().push(name);
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok::<(), ErrorKind>(())
            })
        });
        for result in join_all(ops).await {
            result.unwrap();
        }

        assert_eq!(*order.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overload_rejection() {
        let limiter = limiter(1, 0, Some(1));
        let (gate_tx, gate_rx) = oneshot::channel::<()>();
        let (started_tx, started_rx) = oneshot::channel::<()>();

        let blocker = {
            let limiter = limiter.clone();
            tokio::spawn(async move {
                limiter
                    .run(async move {
                        let _ = started_tx.send(());
                        let _ = gate_rx.await;
                        Ok::<(), ErrorKind>(())
                    })
                    .await
            })
        };
        started_rx.await.unwrap();

        // Fills the single queue slot
        let queued = {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.run(async { Ok::<(), ErrorKind>(()) }).await })
        };
        tokio::task::yield_now().await;
        assert_eq!(limiter.queue_len(), 1);

        // Queue is full and a slot is taken: rejected without running
        let ran = Arc::new(AtomicUsize::new(0));
        let result = {
            let ran = Arc::clone(&ran);
            limiter
                .run(async move {
                    ran.fetch_add(1, Ordering::SeqCst);
                    Ok::<(), ErrorKind>(())
                })
                .await
        };
        assert!(matches!(result, Err(ErrorKind::Overloaded(1))));
        assert_eq!(ran.load(Ordering::SeqCst), 0);

        gate_tx.send(()).unwrap();
        blocker.await.unwrap().unwrap();
        queued.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_queue_drains_after_overload() {
        let limiter = limiter(1, 10, Some(2));
        let results = join_all((0..5).map(|i| {
            let limiter = limiter.clone();
            async move { limiter.run(async move { Ok::<usize, ErrorKind>(i) }).await }
        }))
        .await;

        // First submission starts immediately, two fit in the queue,
        // the rest are rejected; the limiter ends up idle.
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 3);
        assert!(matches!(results[3], Err(ErrorKind::Overloaded(2))));
        assert!(matches!(results[4], Err(ErrorKind::Overloaded(2))));
        assert_eq!(limiter.active_count(), 0);
        assert_eq!(limiter.queue_len(), 0);
    }
}
