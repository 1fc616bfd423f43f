//! Health check endpoints.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use formgate_common::MetricsSnapshot;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Basic health check (is the server running?)
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
pub struct ReadyResponse {
    status: &'static str,
    store: &'static str,
}

/// Readiness check (is the replay store reachable?)
pub async fn ready_check(State(state): State<AppState>) -> Result<Json<ReadyResponse>, StatusCode> {
    match state.store.ping().await {
        Ok(()) => Ok(Json(ReadyResponse {
            status: "ready",
            store: state.store.name(),
        })),
        Err(e) => {
            tracing::warn!(store = state.store.name(), error = %e, "Readiness check failed");
            // Submissions would all be rejected while the store is down
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

#[derive(Serialize)]
pub struct MetricsResponse {
    uptime_secs: u64,
    #[serde(flatten)]
    decisions: MetricsSnapshot,
}

/// Metrics endpoint (for monitoring)
pub async fn metrics(State(state): State<AppState>) -> Json<MetricsResponse> {
    Json(MetricsResponse {
        uptime_secs: state.uptime_secs(),
        decisions: state.evaluator.stats(),
    })
}
