use super::tracker::HealthTracker;
use crate::config::DependencyConfig;
use crate::metrics;
use std::future::Future;
use tracing::{debug, warn};

/// Retry executor with linear backoff, reporting every outcome to the tracker
pub struct RetryExecutor<'a> {
    name: &'a str,
    config: &'a DependencyConfig,
    tracker: &'a HealthTracker,
}

impl<'a> RetryExecutor<'a> {
    /// Create a new retry executor for one dependency
    pub fn new(name: &'a str, config: &'a DependencyConfig, tracker: &'a HealthTracker) -> Self {
        Self {
            name,
            config,
            tracker,
        }
    }

    /// Run `f` up to `max_retries` times, returning the last error if all fail.
    ///
    /// After failed attempt `n` the executor waits `retry_delay_ms * n`
    /// before trying again.
    pub async fn execute<F, Fut, T>(&self, mut f: F) -> anyhow::Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let max_attempts = self.config.max_retries.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(
                dependency = %self.name,
                attempt,
                max_retries = max_attempts,
                "Executing primary operation"
            );

            match f().await {
                Ok(result) => {
                    if attempt > 1 {
                        debug!(dependency = %self.name, attempt, "Primary operation succeeded after retries");
                    }
                    self.tracker.record_success(self.name);
                    metrics::record_attempt(self.name, true);
                    return Ok(result);
                }
                Err(e) => {
                    self.tracker.record_failure(self.name, &e.to_string());
                    metrics::record_attempt(self.name, false);

                    if attempt >= max_attempts {
                        warn!(
                            dependency = %self.name,
                            attempt,
                            error = %e,
                            "Primary operation failed after max retries"
                        );
                        return Err(e);
                    }

                    let wait = self.config.retry_delay(attempt);
                    debug!(
                        dependency = %self.name,
                        attempt,
                        wait_ms = wait.as_millis() as u64,
                        error = %e,
                        "Primary operation failed, retrying after backoff"
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }
}
