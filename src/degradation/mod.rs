//! Graceful degradation over a batch of independent operations.
//!
//! Every task is spawned immediately and raced against its own timeout. A
//! task that misses the deadline is not cancelled; it finishes in the
//! background and its result is discarded. Failures and timeouts are
//! expected and never turn into an error for the batch.

use crate::metrics;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// One named operation in a degradation batch
pub struct DegradationTask<T> {
    /// Name used in logs and metrics
    pub name: String,
    /// Higher priorities are started first; results are not reordered
    pub priority: i32,
    op: BoxFuture<'static, anyhow::Result<T>>,
}

impl<T> DegradationTask<T> {
    pub fn new<F>(name: impl Into<String>, priority: i32, op: F) -> Self
    where
        F: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        Self {
            name: name.into(),
            priority,
            op: Box::pin(op),
        }
    }
}

impl<T> std::fmt::Debug for DegradationTask<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DegradationTask")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("op", &"<future>")
            .finish()
    }
}

/// Run all tasks concurrently, each under `timeout`, and return the values
/// of those that succeeded in time, in the order they settled.
pub async fn run_with_degradation<T>(mut tasks: Vec<DegradationTask<T>>, timeout: Duration) -> Vec<T>
where
    T: Send + 'static,
{
    let total = tasks.len();
    tasks.sort_by(|a, b| b.priority.cmp(&a.priority));

    let mut pending: FuturesUnordered<_> = tasks
        .into_iter()
        .map(|task| {
            let handle = tokio::spawn(task.op);
            let name = task.name;
            async move { (name, tokio::time::timeout(timeout, handle).await) }
        })
        .collect();

    let mut results = Vec::with_capacity(total);
    while let Some((name, outcome)) = pending.next().await {
        match outcome {
            Ok(Ok(Ok(value))) => {
                debug!(task = %name, "Degradation task completed");
                metrics::record_degradation_outcome("success");
                results.push(value);
            }
            Ok(Ok(Err(e))) => {
                warn!(task = %name, error = %e, "Degradation task failed");
                metrics::record_degradation_outcome("failure");
            }
            Ok(Err(e)) => {
                warn!(task = %name, error = %e, "Degradation task panicked");
                metrics::record_degradation_outcome("failure");
            }
            Err(_) => {
                warn!(
                    task = %name,
                    timeout_ms = timeout.as_millis() as u64,
                    "Degradation task missed its deadline, result discarded"
                );
                metrics::record_degradation_outcome("timeout");
            }
        }
    }

    info!(
        completed = results.len(),
        total,
        "Degradation batch finished"
    );
    results
}
