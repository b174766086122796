//! Health check routes.

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};

use crate::api::models::HealthResponse;
use crate::api::server::AppState;

/// Create the health router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/live", get(liveness_check))
}

/// Health check endpoint with poll cycle details.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let cycle = state.store.cycle_info();
    let status = match (cycle.cycles_completed, &cycle.last_error) {
        (0, _) => "starting",
        (_, Some(_)) => "degraded",
        (_, None) => "healthy",
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        channels: state.store.registry().len(),
        cycles_completed: cycle.cycles_completed,
        last_scrape: cycle.last_scrape,
        quota_remaining: cycle.quota_remaining,
        last_cycle_duration_ms: cycle.last_cycle_duration_ms,
        last_error: cycle.last_error,
    })
}

/// Readiness check - has at least one poll cycle completed?
/// Returns HTTP 200 once it has, HTTP 503 before.
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    if state.store.cycle_info().cycles_completed > 0 {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready")
    }
}

/// Liveness check - is the service alive?
/// Returns HTTP 200 with status and uptime if the service is responsive.
async fn liveness_check(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = state.start_time.elapsed().as_secs();
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "alive",
            "uptime_secs": uptime
        })),
    )
}
