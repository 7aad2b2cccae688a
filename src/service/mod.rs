//! The functional surface of the resilience layer.
//!
//! [`ResilienceService`] owns the immutable configuration and the shared
//! [`HealthTracker`]. Callers hand it a dependency name and the operations
//! to run; it decides between the primary path, retries and the fallback
//! chain.

use crate::circuit_breaker::{HealthTracker, RetryExecutor, ServiceHealth};
use crate::config::ResilienceConfig;
use crate::degradation::{self, DegradationTask};
use crate::error::{ResilienceError, Result};
use crate::fallback::{FallbackOp, FallbackResolver};
use crate::metrics;
use crate::rate_limit::{self, SlidingWindowLimiter};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Resilience service shared by every caller in the process
#[derive(Debug, Clone)]
pub struct ResilienceService {
    config: Arc<ResilienceConfig>,
    tracker: HealthTracker,
}

impl ResilienceService {
    /// Create a service with an empty health store
    pub fn new(config: ResilienceConfig) -> Self {
        let tracker = HealthTracker::new(config.thresholds(), config.circuit_breaker.clone());

        info!(
            dependencies = config.dependencies.len(),
            static_fallbacks = config.static_fallbacks.len(),
            "Initialized resilience service"
        );

        Self {
            config: Arc::new(config),
            tracker,
        }
    }

    pub fn config(&self) -> &ResilienceConfig {
        &self.config
    }

    pub fn tracker(&self) -> &HealthTracker {
        &self.tracker
    }

    /// Run `primary` for `name` under that dependency's resilience policy.
    ///
    /// Unconfigured dependencies run `primary` once and its error is returned
    /// as [`ResilienceError::Operation`]. Configured dependencies fail only
    /// with [`ResilienceError::Exhausted`], after retries, `fallbacks` and
    /// static fallback data have all been tried.
    pub async fn run_with_resilience<T, F, Fut>(
        &self,
        name: &str,
        mut primary: F,
        fallbacks: Vec<FallbackOp<'_, T>>,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
        T: DeserializeOwned,
    {
        let Some(dependency) = self.config.dependencies.get(name) else {
            debug!(dependency = %name, "No resilience policy, running operation directly");
            return primary().await.map_err(ResilienceError::Operation);
        };

        let resolver = FallbackResolver::new(
            name,
            &dependency.fallback_chain,
            &self.config.static_fallbacks,
        );

        if self.tracker.is_open(name) {
            warn!(dependency = %name, "Circuit breaker open, skipping primary operation");
            metrics::record_short_circuit(name);
            return resolver.resolve(fallbacks).await;
        }

        match RetryExecutor::new(name, dependency, &self.tracker)
            .execute(primary)
            .await
        {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!(
                    dependency = %name,
                    error = %e,
                    "Primary operation exhausted, trying fallback chain"
                );
                resolver.resolve(fallbacks).await
            }
        }
    }

    /// [`run_with_resilience`](Self::run_with_resilience) without dynamic fallbacks
    pub async fn execute<T, F, Fut>(&self, name: &str, primary: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
        T: DeserializeOwned,
    {
        self.run_with_resilience(name, primary, Vec::new()).await
    }

    /// Run a synthetic check and record its outcome like real traffic
    pub async fn perform_health_check<F, Fut>(&self, name: &str, probe: F) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = bool>,
    {
        let healthy = probe().await;

        if healthy {
            self.tracker.record_success(name);
            debug!(dependency = %name, "Health check passed");
        } else {
            self.tracker.record_failure(name, "Health check failed");
            warn!(dependency = %name, "Health check failed");
        }
        metrics::record_health_check(name, healthy);

        healthy
    }

    /// Whether the circuit for `name` is open
    pub fn is_open(&self, name: &str) -> bool {
        self.tracker.is_open(name)
    }

    /// Copy of every tracked health record
    pub fn snapshot(&self) -> HashMap<String, ServiceHealth> {
        self.tracker.snapshot()
    }

    /// Create an independent limiter admitting `requests_per_minute` operations
    pub fn create_limiter(requests_per_minute: u32) -> SlidingWindowLimiter {
        rate_limit::create_limiter(requests_per_minute)
    }

    /// Run a batch of tasks and keep the ones that succeed within `timeout`
    pub async fn run_with_degradation<T>(
        &self,
        tasks: Vec<DegradationTask<T>>,
        timeout: Duration,
    ) -> Vec<T>
    where
        T: Send + 'static,
    {
        degradation::run_with_degradation(tasks, timeout).await
    }

    /// Aggregated view for health endpoints
    pub fn health_report(&self) -> HealthReport {
        let dependencies: BTreeMap<String, DependencyHealth> = self
            .tracker
            .all_states()
            .into_iter()
            .map(|(name, health, circuit)| {
                (
                    name,
                    DependencyHealth {
                        is_healthy: health.is_healthy,
                        last_check: health.last_check,
                        failure_count: health.failure_count,
                        last_error: health.last_error,
                        circuit_open: circuit == crate::circuit_breaker::CircuitState::Open,
                    },
                )
            })
            .collect();

        let degraded = dependencies
            .values()
            .any(|dependency| !dependency.is_healthy || dependency.circuit_open);

        HealthReport {
            status: if degraded {
                OverallStatus::Degraded
            } else {
                OverallStatus::Healthy
            },
            dependencies,
        }
    }
}

/// Overall status reported by the health endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Healthy,
    Degraded,
}

/// Health of one dependency as exposed to observers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyHealth {
    pub is_healthy: bool,
    pub last_check: DateTime<Utc>,
    pub failure_count: u32,
    pub last_error: Option<String>,
    pub circuit_open: bool,
}

/// Health of every tracked dependency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: OverallStatus,
    pub dependencies: BTreeMap<String, DependencyHealth>,
}
