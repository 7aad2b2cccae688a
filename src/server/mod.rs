use crate::metrics::MetricsService;
use crate::service::ResilienceService;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::trace::TraceLayer;

/// Shared state of the observability endpoints
#[derive(Debug, Clone)]
pub struct AppState {
    pub service: ResilienceService,
    pub metrics: Option<MetricsService>,
}

/// Build the router serving `/health` and `/metrics`
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Health of every tracked dependency.
///
/// Always 200: a degraded dependency is served through fallbacks, so the
/// process itself stays in rotation.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.service.health_report())
}

/// Metrics endpoint handler
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.metrics {
        Some(metrics) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            metrics.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "Metrics disabled").into_response(),
    }
}
