//! App access token management.
//!
//! - [`Credential`]: a bearer token with its issuance, expiry and renewal instants
//! - [`CredentialManager`]: caches the current credential and renews it lazily
//!   once the midpoint of its validity window has passed

mod error;
mod manager;
mod types;

pub use error::CredentialError;
pub use manager::CredentialManager;
pub use types::Credential;
