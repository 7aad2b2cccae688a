use super::types::{CircuitBreakerConfig, CircuitState, ServiceHealth};
use crate::metrics;
use chrono::Utc;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Health and circuit state of one dependency, guarded together so a
/// reader never sees a failure count that disagrees with the circuit.
#[derive(Debug, Clone)]
struct DependencyState {
    health: ServiceHealth,
    circuit: CircuitState,
}

impl Default for DependencyState {
    fn default() -> Self {
        Self {
            health: ServiceHealth::default(),
            circuit: CircuitState::Closed,
        }
    }
}

/// Process-wide health store for all dependencies.
///
/// Records are created lazily on first use and never removed. Cloning is
/// cheap and every clone observes the same state.
#[derive(Debug, Clone)]
pub struct HealthTracker {
    /// Per-dependency state
    entries: Arc<DashMap<String, DependencyState>>,
    /// Consecutive failures that open the circuit, per configured dependency
    thresholds: Arc<HashMap<String, u32>>,
    /// Shared circuit configuration
    config: CircuitBreakerConfig,
}

impl HealthTracker {
    /// Create a tracker with the given circuit thresholds
    pub fn new(thresholds: HashMap<String, u32>, config: CircuitBreakerConfig) -> Self {
        debug!(
            dependencies = thresholds.len(),
            reset_timeout_secs = config.reset_timeout_secs,
            "Creating health tracker"
        );

        Self {
            entries: Arc::new(DashMap::new()),
            thresholds: Arc::new(thresholds),
            config,
        }
    }

    /// Record a successful call. Always closes the circuit.
    pub fn record_success(&self, name: &str) {
        let mut entry = self.entries.entry(name.to_string()).or_default();
        let was_open = entry.circuit == CircuitState::Open;

        entry.health.is_healthy = true;
        entry.health.failure_count = 0;
        entry.health.last_check = Utc::now();
        entry.health.last_error = None;
        entry.circuit = CircuitState::Closed;
        drop(entry);

        if was_open {
            info!(dependency = %name, "Circuit breaker closing after success");
            metrics::record_circuit_state(name, CircuitState::Closed);
        }
    }

    /// Record a failed call, opening the circuit once the threshold is hit
    pub fn record_failure(&self, name: &str, error: &str) {
        let mut entry = self.entries.entry(name.to_string()).or_default();

        entry.health.failure_count = entry.health.failure_count.saturating_add(1);
        entry.health.is_healthy = false;
        entry.health.last_check = Utc::now();
        entry.health.last_error = Some(error.to_string());

        let failure_count = entry.health.failure_count;
        let threshold = self.thresholds.get(name).copied();

        debug!(
            dependency = %name,
            failure_count,
            threshold = ?threshold,
            error = %error,
            "Recorded dependency failure"
        );

        let opened = match threshold {
            Some(threshold) if failure_count >= threshold => {
                let was_closed = entry.circuit == CircuitState::Closed;
                entry.circuit = CircuitState::Open;
                was_closed
            }
            _ => false,
        };
        drop(entry);

        if opened {
            warn!(
                dependency = %name,
                failure_count,
                reset_after = ?self.config.reset_timeout(),
                "Circuit breaker opening"
            );
            metrics::record_circuit_state(name, CircuitState::Open);
            self.schedule_reset(name);
        }
    }

    /// Current health of a dependency, creating a healthy record if unseen
    pub fn get(&self, name: &str) -> ServiceHealth {
        self.entries
            .entry(name.to_string())
            .or_default()
            .health
            .clone()
    }

    /// Whether the circuit for a dependency is open. Unknown names are closed.
    pub fn is_open(&self, name: &str) -> bool {
        self.state(name) == CircuitState::Open
    }

    /// Circuit state of a dependency
    pub fn state(&self, name: &str) -> CircuitState {
        self.entries
            .get(name)
            .map(|entry| entry.circuit)
            .unwrap_or(CircuitState::Closed)
    }

    /// Copy of every tracked health record
    pub fn snapshot(&self) -> HashMap<String, ServiceHealth> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().health.clone()))
            .collect()
    }

    /// Health and circuit state for every tracked dependency
    pub fn all_states(&self) -> Vec<(String, ServiceHealth, CircuitState)> {
        self.entries
            .iter()
            .map(|entry| {
                (
                    entry.key().clone(),
                    entry.value().health.clone(),
                    entry.value().circuit,
                )
            })
            .collect()
    }

    /// Spawn the timer that closes the circuit after the cool-down.
    ///
    /// Superseded timers are not cancelled: a reset is idempotent, so a
    /// stale timer firing after a later reopen simply closes the circuit.
    fn schedule_reset(&self, name: &str) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!(
                    dependency = %name,
                    "No async runtime available, circuit will stay open until the next success"
                );
                return;
            }
        };

        let entries = Arc::clone(&self.entries);
        let name = name.to_string();
        let timeout = self.config.reset_timeout();

        handle.spawn(async move {
            tokio::time::sleep(timeout).await;
            reset_circuit(&entries, &name);
        });
    }
}

fn reset_circuit(entries: &DashMap<String, DependencyState>, name: &str) {
    if let Some(mut entry) = entries.get_mut(name) {
        let was_open = entry.circuit == CircuitState::Open;
        entry.circuit = CircuitState::Closed;
        entry.health.failure_count = 0;
        drop(entry);

        info!(dependency = %name, was_open, "Circuit breaker reset timer fired");
        if was_open {
            metrics::record_circuit_state(name, CircuitState::Closed);
        }
    }
}
