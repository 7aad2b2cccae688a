pub mod retry;
pub mod tracker;
pub mod types;

pub use retry::RetryExecutor;
pub use tracker::HealthTracker;
pub use types::{CircuitBreakerConfig, CircuitState, ServiceHealth};
