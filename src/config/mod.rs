use crate::circuit_breaker::CircuitBreakerConfig;
use crate::error::{ResilienceError, Result};
use crate::fallback::StaticFallbacks;
use crate::healthcheck::HealthCheckConfig;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Main resilience configuration, loaded once at process start
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResilienceConfig {
    /// Health/metrics server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Circuit breaker settings shared by all dependencies
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,
    /// Active health check settings
    #[serde(default)]
    pub health_check: HealthCheckConfig,
    /// Resilience policy per dependency name
    #[serde(default)]
    pub dependencies: HashMap<String, DependencyConfig>,
    /// Canned degraded data keyed by dependency, then fallback identifier
    #[serde(default)]
    pub static_fallbacks: StaticFallbacks,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,
    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Resilience policy for one external dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyConfig {
    /// Attempts of the primary operation before falling back
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base delay, multiplied by the attempt number between retries
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Static fallback identifiers, tried in order
    #[serde(default)]
    pub fallback_chain: Vec<String>,
    /// Consecutive failures that open the circuit
    #[serde(default = "default_circuit_breaker_threshold")]
    pub circuit_breaker_threshold: u32,
    /// URL probed by active health checks
    #[serde(default)]
    pub health_check_url: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_circuit_breaker_threshold() -> u32 {
    5
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DependencyConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            fallback_chain: vec![],
            circuit_breaker_threshold: default_circuit_breaker_threshold(),
            health_check_url: None,
        }
    }
}

impl DependencyConfig {
    /// Wait after the given failed attempt (1-based)
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_delay_ms.saturating_mul(attempt as u64))
    }
}

impl ResilienceConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ResilienceError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| ResilienceError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        for (name, dependency) in &self.dependencies {
            if name.is_empty() {
                return Err(ResilienceError::Config(
                    "Dependency name cannot be empty".to_string(),
                ));
            }

            if dependency.max_retries == 0 {
                return Err(ResilienceError::Config(format!(
                    "max_retries must be > 0 for dependency: {}",
                    name
                )));
            }

            if dependency.circuit_breaker_threshold == 0 {
                return Err(ResilienceError::Config(format!(
                    "circuit_breaker_threshold must be > 0 for dependency: {}",
                    name
                )));
            }

            if dependency.fallback_chain.iter().any(|id| id.is_empty()) {
                return Err(ResilienceError::Config(format!(
                    "Fallback identifiers cannot be empty for dependency: {}",
                    name
                )));
            }

            if let Some(url) = &dependency.health_check_url {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(ResilienceError::Config(format!(
                        "Health check URL must start with http:// or https:// for dependency: {}",
                        name
                    )));
                }
            }
        }

        if self.circuit_breaker.reset_timeout_secs == 0 {
            return Err(ResilienceError::Config(
                "Circuit breaker reset timeout must be > 0".to_string(),
            ));
        }

        if self.health_check.enabled && self.health_check.interval_secs == 0 {
            return Err(ResilienceError::Config(
                "Health check interval must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Circuit thresholds for every configured dependency
    pub fn thresholds(&self) -> HashMap<String, u32> {
        self.dependencies
            .iter()
            .map(|(name, dependency)| (name.clone(), dependency.circuit_breaker_threshold))
            .collect()
    }

    /// Policies for the chatbot's known external services
    pub fn builtin() -> Self {
        let mut dependencies = HashMap::new();
        dependencies.insert(
            "qloo".to_string(),
            DependencyConfig {
                max_retries: 3,
                retry_delay_ms: 1000,
                fallback_chain: vec![
                    "cached_recommendations".to_string(),
                    "popular_items".to_string(),
                ],
                circuit_breaker_threshold: 5,
                health_check_url: None,
            },
        );
        dependencies.insert(
            "search".to_string(),
            DependencyConfig {
                max_retries: 2,
                retry_delay_ms: 500,
                fallback_chain: vec!["cached_results".to_string()],
                circuit_breaker_threshold: 3,
                health_check_url: None,
            },
        );
        dependencies.insert(
            "payments".to_string(),
            DependencyConfig {
                max_retries: 3,
                retry_delay_ms: 2000,
                fallback_chain: vec![],
                circuit_breaker_threshold: 3,
                health_check_url: None,
            },
        );
        dependencies.insert(
            "llm".to_string(),
            DependencyConfig {
                max_retries: 2,
                retry_delay_ms: 1000,
                fallback_chain: vec!["canned_reply".to_string()],
                circuit_breaker_threshold: 5,
                health_check_url: None,
            },
        );

        let static_fallbacks = StaticFallbacks::new()
            .with(
                "qloo",
                "popular_items",
                json!({
                    "recommendations": [
                        {"name": "The Shawshank Redemption", "type": "movie"},
                        {"name": "Pride and Prejudice", "type": "book"},
                        {"name": "Abbey Road", "type": "album"}
                    ],
                    "degraded": true
                }),
            )
            .with(
                "search",
                "cached_results",
                json!({
                    "results": [],
                    "message": "Search is temporarily unavailable, please try again shortly.",
                    "degraded": true
                }),
            )
            .with(
                "llm",
                "canned_reply",
                json!({
                    "reply": "Sorry, I'm having trouble thinking right now. Please try again in a moment.",
                    "degraded": true
                }),
            );

        Self {
            server: ServerConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            health_check: HealthCheckConfig::default(),
            dependencies,
            static_fallbacks,
        }
    }
}
