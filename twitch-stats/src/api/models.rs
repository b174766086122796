//! Request and response bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::ChannelView;

/// One element of the `GET /` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelStatsResponse {
    /// Display name.
    pub name: String,
    pub online: bool,
    /// Unix time the current broadcast started, 0 when offline.
    pub uptime: i64,
    pub followers: u64,
    pub viewers: u64,
    pub views: u64,
}

impl From<&ChannelView> for ChannelStatsResponse {
    fn from(view: &ChannelView) -> Self {
        Self {
            name: view.record.display_name.clone(),
            online: view.state.online,
            uptime: view.state.up_since.map(|t| t.timestamp()).unwrap_or(0),
            followers: view.state.followers,
            viewers: view.state.viewers,
            views: view.state.total_views,
        }
    }
}

/// `GET /health` body.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub channels: usize,
    pub cycles_completed: u64,
    pub last_scrape: Option<DateTime<Utc>>,
    pub quota_remaining: u32,
    pub last_cycle_duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Request to update the log filter.
#[derive(Debug, Deserialize)]
pub struct UpdateLogFilterRequest {
    pub filter: String,
}

/// Response for logging configuration.
#[derive(Debug, Serialize)]
pub struct LoggingConfigResponse {
    pub filter: String,
    pub available_modules: Vec<ModuleInfo>,
}

#[derive(Debug, Serialize)]
pub struct ModuleInfo {
    pub name: String,
    pub description: String,
}
