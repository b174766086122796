//! Application-wide error types.

use thiserror::Error;

use crate::credentials::CredentialError;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Application-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Helix API error: {0}")]
    Helix(#[from] helix_client::HelixError),

    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("Channel resolution failed: {0}")]
    Resolution(String),

    #[error("Cycle aborted: {0}")]
    CycleAborted(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::Resolution(msg.into())
    }
}
