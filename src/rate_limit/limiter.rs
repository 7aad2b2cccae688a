use crate::metrics;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Sliding-window limiter that delays operations instead of rejecting them.
///
/// Clones share the same window.
#[derive(Debug, Clone)]
pub struct SlidingWindowLimiter {
    /// Admissions allowed per window
    limit: usize,
    /// Rolling window length
    window: Duration,
    /// Admission timestamps, oldest first
    admitted: Arc<Mutex<VecDeque<Instant>>>,
}

impl SlidingWindowLimiter {
    /// Create a limiter admitting `limit` operations per `window`
    pub fn new(limit: u32, window: Duration) -> Self {
        let limit = if limit == 0 {
            warn!("Rate limit of 0 would block forever, using 1");
            1
        } else {
            limit as usize
        };

        Self {
            limit,
            window,
            admitted: Arc::new(Mutex::new(VecDeque::with_capacity(limit))),
        }
    }

    /// Wait until the window has room, then record an admission.
    ///
    /// Returns how long the caller was held back.
    pub async fn acquire(&self) -> Duration {
        let start = Instant::now();

        loop {
            let wait = {
                let mut admitted = self.admitted.lock().await;
                let now = Instant::now();

                while let Some(&oldest) = admitted.front() {
                    if now.duration_since(oldest) >= self.window {
                        admitted.pop_front();
                    } else {
                        break;
                    }
                }

                match admitted.front() {
                    Some(&oldest) if admitted.len() >= self.limit => {
                        self.window - now.duration_since(oldest)
                    }
                    _ => {
                        admitted.push_back(now);
                        break;
                    }
                }
            };

            debug!(
                limit = self.limit,
                wait_ms = wait.as_millis() as u64,
                "Rate limit reached, waiting for window"
            );
            tokio::time::sleep(wait).await;
        }

        let waited = start.elapsed();
        if !waited.is_zero() {
            metrics::record_rate_limit_wait(waited);
        }
        waited
    }

    /// Run `f` once the limiter admits it
    pub async fn run<F, Fut, T>(&self, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.acquire().await;
        f().await
    }

    /// Admissions currently inside the window
    pub async fn in_window(&self) -> usize {
        let admitted = self.admitted.lock().await;
        let now = Instant::now();
        admitted
            .iter()
            .filter(|&&at| now.duration_since(at) < self.window)
            .count()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}
