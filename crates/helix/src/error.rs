use thiserror::Error;

/// Errors returned by [`HelixClient`](crate::HelixClient).
#[derive(Debug, Error)]
pub enum HelixError {
    /// The server rejected the credential or the client id (HTTP 401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A single request was given more identifiers than the API accepts.
    #[error("batch of {len} identifiers exceeds the limit of {max}")]
    BatchTooLarge { len: usize, max: usize },

    /// Any other non-success status.
    #[error("server returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl HelixError {
    /// Whether the caller should drop its credential and request a new one.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}
