//! Response models for the Helix endpoints.
//!
//! Only the fields this crate consumes are declared; serde ignores the rest.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Generic `{"data": [...]}` envelope used by Helix list endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// A live stream as returned by `GET /streams`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRecord {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub user_login: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub game_name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub viewer_count: u64,
    pub started_at: DateTime<Utc>,
}

/// A user as returned by `GET /users`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub login: String,
    pub display_name: String,
    #[serde(default)]
    pub view_count: u64,
}

/// `GET /users/follows` response; only the total is of interest.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FollowTotal {
    #[serde(default)]
    pub total: u64,
}

/// App access token from the client-credentials grant.
#[derive(Debug, Clone, Deserialize)]
pub struct AppToken {
    pub access_token: String,
    /// Lifetime in seconds.
    pub expires_in: u64,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Result of one streams lookup together with the quota left afterwards.
#[derive(Debug, Clone, Default)]
pub struct StreamsPage {
    pub streams: Vec<StreamRecord>,
    pub remaining_quota: u32,
}
