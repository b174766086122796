//! Credential error types.

use helix_client::HelixError;
use thiserror::Error;

/// Errors that can occur while acquiring or renewing a credential.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The token exchange failed.
    #[error("Token refresh failed: {0}")]
    Refresh(#[from] HelixError),
}
