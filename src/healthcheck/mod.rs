use crate::error::{ResilienceError, Result};
use crate::service::ResilienceService;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};

/// Health check configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckConfig {
    /// Enable active health checks
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Interval between health checks in seconds
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    /// Health check timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Expected HTTP status code
    #[serde(default = "default_expected_status")]
    pub expected_status: u16,
}

fn default_enabled() -> bool {
    true
}

fn default_interval() -> u64 {
    30
}

fn default_timeout() -> u64 {
    5
}

fn default_expected_status() -> u16 {
    200
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            interval_secs: default_interval(),
            timeout_secs: default_timeout(),
            expected_status: default_expected_status(),
        }
    }
}

/// A synthetic check of one dependency
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Returns true when the dependency looks healthy
    async fn check(&self) -> bool;
}

/// Probe that expects a given status from an HTTP GET
#[derive(Debug, Clone)]
pub struct HttpProbe {
    url: String,
    expected_status: u16,
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(url: impl Into<String>, expected_status: u16, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            expected_status,
            client,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl HealthProbe for HttpProbe {
    async fn check(&self) -> bool {
        debug!(url = %self.url, "Performing health check");

        match self.client.get(&self.url).send().await {
            Ok(response) => {
                let status = response.status();
                let success = status.as_u16() == self.expected_status;
                if !success {
                    warn!(
                        url = %self.url,
                        status = %status,
                        expected = self.expected_status,
                        "Health check failed: unexpected status"
                    );
                }
                success
            }
            Err(e) => {
                warn!(url = %self.url, error = %e, "Health check failed: request error");
                false
            }
        }
    }
}

/// Periodically probes dependencies that have a `health_check_url`
pub struct HealthChecker {
    config: HealthCheckConfig,
    client: reqwest::Client,
}

impl std::fmt::Debug for HealthChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthChecker")
            .field("config", &self.config)
            .field("client", &"<reqwest::Client>")
            .finish()
    }
}

impl HealthChecker {
    /// Create a new health checker
    pub fn new(config: HealthCheckConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                ResilienceError::Internal(format!("Failed to create health check client: {}", e))
            })?;

        Ok(Self { config, client })
    }

    /// One HTTP probe per dependency with a health check URL
    pub fn probes(&self, service: &ResilienceService) -> Vec<(String, Arc<dyn HealthProbe>)> {
        let mut probes: Vec<(String, Arc<dyn HealthProbe>)> = service
            .config()
            .dependencies
            .iter()
            .filter_map(|(name, dependency)| {
                dependency.health_check_url.as_ref().map(|url| {
                    let probe: Arc<dyn HealthProbe> = Arc::new(HttpProbe::new(
                        url.clone(),
                        self.config.expected_status,
                        self.client.clone(),
                    ));
                    (name.clone(), probe)
                })
            })
            .collect();
        probes.sort_by(|a, b| a.0.cmp(&b.0));
        probes
    }

    /// Start active health checking in the background
    pub fn start_active_checks(&self, service: ResilienceService) -> Option<JoinHandle<()>> {
        if !self.config.enabled {
            info!("Active health checks disabled");
            return None;
        }

        let probes = self.probes(&service);
        if probes.is_empty() {
            info!("No dependencies with a health check URL, skipping active checks");
            return None;
        }

        let period = Duration::from_secs(self.config.interval_secs);

        Some(tokio::spawn(async move {
            let mut check_interval = interval(period);

            info!(
                interval_secs = period.as_secs(),
                dependencies = probes.len(),
                "Started active health checks"
            );

            loop {
                check_interval.tick().await;

                for (name, probe) in &probes {
                    service
                        .perform_health_check(name, || probe.check())
                        .await;
                }
            }
        }))
    }

    /// Get health check configuration
    pub fn config(&self) -> &HealthCheckConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HealthCheckConfig::default();
        assert!(config.enabled);
        assert_eq!(config.interval_secs, 30);
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.expected_status, 200);
    }

    #[test]
    fn test_health_checker_creation() {
        let checker = HealthChecker::new(HealthCheckConfig::default()).unwrap();
        assert_eq!(checker.config().interval_secs, 30);
    }

    #[tokio::test]
    async fn test_active_checks_disabled() {
        let config = HealthCheckConfig {
            enabled: false,
            ..Default::default()
        };
        let checker = HealthChecker::new(config).unwrap();
        let service = ResilienceService::new(crate::config::ResilienceConfig::builtin());

        assert!(checker.start_active_checks(service).is_none());
    }

    #[tokio::test]
    async fn test_no_probes_without_urls() {
        let checker = HealthChecker::new(HealthCheckConfig::default()).unwrap();
        let service = ResilienceService::new(crate::config::ResilienceConfig::builtin());

        assert!(checker.probes(&service).is_empty());
        assert!(checker.start_active_checks(service).is_none());
    }

    #[tokio::test]
    async fn test_unreachable_probe_is_unhealthy() {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(200))
            .build()
            .unwrap();
        let probe = HttpProbe::new("http://127.0.0.1:1/health", 200, client);
        assert!(!probe.check().await);
    }
}
