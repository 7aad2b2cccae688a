use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Circuit breaker state
///
/// There is no half-open probing state: an open circuit closes either on
/// the next recorded success or when its reset timer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CircuitState {
    /// Circuit is closed, the primary operation is attempted
    Closed,
    /// Circuit is open, calls go straight to the fallback chain
    Open,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "Closed"),
            CircuitState::Open => write!(f, "Open"),
        }
    }
}

/// Circuit breaker configuration shared by all dependencies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Time an open circuit waits before it is reset to closed
    #[serde(default = "default_reset_timeout_secs")]
    pub reset_timeout_secs: u64,
}

fn default_reset_timeout_secs() -> u64 {
    300
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            reset_timeout_secs: default_reset_timeout_secs(),
        }
    }
}

impl CircuitBreakerConfig {
    pub fn reset_timeout(&self) -> Duration {
        Duration::from_secs(self.reset_timeout_secs)
    }
}

/// Health record of a single dependency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceHealth {
    /// Whether the last recorded outcome was a success
    pub is_healthy: bool,
    /// When the last outcome was recorded
    pub last_check: DateTime<Utc>,
    /// Consecutive failures since the last success or reset
    pub failure_count: u32,
    /// Error text of the last failure
    pub last_error: Option<String>,
}

impl Default for ServiceHealth {
    fn default() -> Self {
        Self {
            is_healthy: true,
            last_check: Utc::now(),
            failure_count: 0,
            last_error: None,
        }
    }
}
