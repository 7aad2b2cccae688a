use crate::circuit_breaker::CircuitState;
use crate::error::{ResilienceError, Result};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Metrics service for collecting and exposing Prometheus metrics
#[derive(Clone)]
pub struct MetricsService {
    handle: Arc<PrometheusHandle>,
}

impl std::fmt::Debug for MetricsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsService")
            .field("handle", &"<PrometheusHandle>")
            .finish()
    }
}

impl MetricsService {
    /// Install the global Prometheus recorder
    pub fn new() -> Result<Self> {
        let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
            ResilienceError::Internal(format!("Failed to install metrics recorder: {}", e))
        })?;

        Self::register_metrics();

        info!("Metrics service initialized successfully");

        Ok(Self::with_handle(handle))
    }

    /// Wrap an existing handle without installing a global recorder
    pub fn with_handle(handle: PrometheusHandle) -> Self {
        Self {
            handle: Arc::new(handle),
        }
    }

    /// Register all metrics with descriptions
    fn register_metrics() {
        describe_counter!(
            "resilience_attempts_total",
            "Primary operation attempts by dependency and outcome"
        );
        describe_counter!(
            "resilience_fallbacks_total",
            "Fallback resolutions by dependency and source"
        );
        describe_counter!(
            "resilience_short_circuits_total",
            "Calls that skipped the primary operation because the circuit was open"
        );
        describe_gauge!(
            "resilience_circuit_breaker_state",
            "Circuit breaker state (0 = closed, 1 = open)"
        );
        describe_counter!(
            "resilience_circuit_breaker_transitions_total",
            "Total number of circuit breaker state transitions"
        );
        describe_counter!(
            "resilience_health_checks_total",
            "Synthetic health checks by dependency and result"
        );
        describe_histogram!(
            "resilience_rate_limit_wait_seconds",
            "Time operations spent waiting for the rate limiter"
        );
        describe_counter!(
            "resilience_degradation_tasks_total",
            "Degradation batch tasks by outcome"
        );

        debug!("All metrics registered with descriptions");
    }

    /// Render metrics in Prometheus format
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Record one attempt of a primary operation
pub fn record_attempt(dependency: &str, success: bool) {
    let labels = [
        ("dependency", dependency.to_string()),
        ("outcome", outcome(success).to_string()),
    ];
    counter!("resilience_attempts_total", &labels).increment(1);
}

/// Record how a fallback chain was resolved (`dynamic`, `static` or `exhausted`)
pub fn record_fallback(dependency: &str, source: &str) {
    let labels = [
        ("dependency", dependency.to_string()),
        ("source", source.to_string()),
    ];
    counter!("resilience_fallbacks_total", &labels).increment(1);
}

/// Record a call that bypassed an open circuit
pub fn record_short_circuit(dependency: &str) {
    let labels = [("dependency", dependency.to_string())];
    counter!("resilience_short_circuits_total", &labels).increment(1);
}

/// Record a circuit breaker transition
pub fn record_circuit_state(dependency: &str, state: CircuitState) {
    let value = match state {
        CircuitState::Closed => 0.0,
        CircuitState::Open => 1.0,
    };
    let labels = [("dependency", dependency.to_string())];
    gauge!("resilience_circuit_breaker_state", &labels).set(value);

    let labels = [
        ("dependency", dependency.to_string()),
        ("to", state.to_string()),
    ];
    counter!("resilience_circuit_breaker_transitions_total", &labels).increment(1);
}

/// Record the outcome of a synthetic health check
pub fn record_health_check(dependency: &str, healthy: bool) {
    let labels = [
        ("dependency", dependency.to_string()),
        ("outcome", outcome(healthy).to_string()),
    ];
    counter!("resilience_health_checks_total", &labels).increment(1);
}

/// Record time spent waiting for a rate limiter
pub fn record_rate_limit_wait(waited: Duration) {
    histogram!("resilience_rate_limit_wait_seconds").record(waited.as_secs_f64());
}

/// Record how a degradation task ended (`success`, `failure` or `timeout`).
///
/// Task names are caller-generated, so they stay in logs and out of labels.
pub fn record_degradation_outcome(result: &str) {
    let labels = [("outcome", result.to_string())];
    counter!("resilience_degradation_tasks_total", &labels).increment(1);
}

fn outcome(success: bool) -> &'static str {
    if success {
        "success"
    } else {
        "failure"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_attempt("qloo", true);
        record_fallback("qloo", "static");
        record_short_circuit("qloo");
        record_circuit_state("qloo", CircuitState::Open);
        record_health_check("qloo", false);
        record_rate_limit_wait(Duration::from_millis(5));
        record_degradation_outcome("timeout");
    }

    #[test]
    fn test_render_with_local_handle() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let service = MetricsService::with_handle(recorder.handle());
        // Nothing recorded through this recorder, so the output is empty
        assert!(service.render().trim().is_empty());
    }

    #[test]
    fn test_degradation_outcome_labels_are_bounded() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        ::metrics::with_local_recorder(&recorder, || {
            record_degradation_outcome("timeout");
            record_degradation_outcome("timeout");
            record_degradation_outcome("success");
        });

        let output = handle.render();
        assert!(output.contains(r#"resilience_degradation_tasks_total{outcome="timeout"} 2"#));
        assert!(output.contains(r#"resilience_degradation_tasks_total{outcome="success"} 1"#));
        assert!(!output.contains("task="));
    }
}
