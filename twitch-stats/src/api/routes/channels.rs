//! Per-channel JSON statistics.

use axum::{
    Json,
    extract::State,
    http::{HeaderValue, header},
    response::IntoResponse,
};

use crate::api::models::ChannelStatsResponse;
use crate::api::server::AppState;

/// `GET /`: every tracked channel in registration order.
pub async fn list_channels(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.store.snapshot();
    let body: Vec<ChannelStatsResponse> = snapshot
        .channels
        .iter()
        .map(ChannelStatsResponse::from)
        .collect();

    (
        [(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        )],
        Json(body),
    )
}
