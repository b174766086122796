//! API route modules.

pub mod channels;
pub mod health;
pub mod logging;
pub mod metrics;

use axum::{Router, routing::get};

use crate::api::server::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(channels::list_channels))
        .route("/metrics", get(metrics::export_metrics))
        .nest("/health", health::router())
        .nest("/api/logging", logging::router())
        .with_state(state)
}
