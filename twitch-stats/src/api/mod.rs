//! HTTP exposition of the channel statistics.
//!
//! - `GET /`: JSON array of per-channel stats
//! - `GET /metrics`: Prometheus text format
//! - `GET /health`, `/health/live`, `/health/ready`
//! - `GET|PUT /api/logging`: runtime log filter

pub mod error;
pub mod models;
pub mod routes;
pub mod server;

pub use error::{ApiError, ApiResult};
pub use server::{ApiServer, ApiServerConfig, AppState};
