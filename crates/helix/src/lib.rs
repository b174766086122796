//! Client for the Twitch Helix API.
//!
//! Covers the handful of endpoints needed to track channel statistics:
//! app access tokens, live streams, user records and follower totals.
//! Every lookup that accepts identifiers is capped at [`MAX_BATCH_SIZE`];
//! use [`chunk_batches`] to split larger sets.

mod batch;
mod client;
mod error;
mod models;

pub use batch::{MAX_BATCH_SIZE, chunk_batches, parse_remaining_quota};
pub use client::{
    DEFAULT_API_BASE, DEFAULT_AUTH_BASE, DEFAULT_TIMEOUT, HelixApi, HelixClient,
    HelixClientBuilder, RATELIMIT_REMAINING_HEADER,
};
pub use error::HelixError;
pub use models::{AppToken, FollowTotal, Page, StreamRecord, StreamsPage, UserRecord};
