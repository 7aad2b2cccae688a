pub mod circuit_breaker;
pub mod config;
pub mod degradation;
pub mod error;
pub mod fallback;
pub mod healthcheck;
pub mod metrics;
pub mod rate_limit;
pub mod server;
pub mod service;

pub use error::{ResilienceError, Result};
pub use service::ResilienceService;

use crate::config::ResilienceConfig;
use crate::healthcheck::HealthChecker;
use crate::metrics::MetricsService;
use crate::server::AppState;
use tracing::info;

/// Start the resilience service and serve its health and metrics endpoints
pub async fn init_server(config: ResilienceConfig) -> Result<()> {
    // Validate configuration
    config.validate()?;

    info!("Starting resilience service");
    info!(
        "Health endpoint listening on {}:{}",
        config.server.host, config.server.port
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let health_check = config.health_check.clone();

    let service = ResilienceService::new(config);
    let metrics = MetricsService::new()?;

    let checker = HealthChecker::new(health_check)?;
    let _checks = checker.start_active_checks(service.clone());

    let app = server::router(AppState {
        service,
        metrics: Some(metrics),
    });

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(ResilienceError::Io)?;

    info!("Resilience service ready");

    axum::serve(listener, app)
        .await
        .map_err(|e| ResilienceError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}

/// Initialize tracing/logging
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "resilience=debug,tower_http=debug".into()),
        )
        .with_target(false)
        .compact()
        .init();
}
