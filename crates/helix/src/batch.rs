//! Batch splitting and quota header parsing.

use reqwest::header::HeaderMap;

use crate::client::RATELIMIT_REMAINING_HEADER;

/// Maximum number of identifiers a single Helix lookup accepts.
pub const MAX_BATCH_SIZE: usize = 100;

/// Split `ids` into consecutive slices of at most [`MAX_BATCH_SIZE`] items.
///
/// Produces `ceil(len / MAX_BATCH_SIZE)` slices and no empty trailing slice.
pub fn chunk_batches<T>(ids: &[T]) -> impl Iterator<Item = &[T]> {
    ids.chunks(MAX_BATCH_SIZE)
}

/// Read the remaining request quota reported by the server.
///
/// A missing or malformed header counts as zero remaining requests.
pub fn parse_remaining_quota(headers: &HeaderMap) -> u32 {
    headers
        .get(RATELIMIT_REMAINING_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u32>().ok())
        .unwrap_or(0)
}
