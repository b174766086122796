//! Lazily renewed app access token.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use helix_client::HelixApi;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use super::error::CredentialError;
use super::types::Credential;

/// Holds the current app access token and renews it once its renewal
/// deadline has passed.
pub struct CredentialManager {
    api: Arc<dyn HelixApi>,
    current: RwLock<Option<Credential>>,
    /// Serializes token exchanges.
    refresh_lock: Mutex<()>,
}

impl CredentialManager {
    /// Create a manager without a credential; the first access refreshes.
    pub fn new(api: Arc<dyn HelixApi>) -> Self {
        Self {
            api,
            current: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Create a manager and acquire the first credential.
    pub async fn bootstrap(api: Arc<dyn HelixApi>) -> Result<Self, CredentialError> {
        let manager = Self::new(api);
        manager.refresh().await?;
        Ok(manager)
    }

    /// The cached credential, if any, regardless of its renewal deadline.
    pub fn cached(&self) -> Option<Credential> {
        self.current.read().clone()
    }

    /// Return a usable credential, renewing it first if due.
    pub async fn current_credential(&self) -> Result<Credential, CredentialError> {
        self.current_credential_at(Utc::now()).await
    }

    /// Same as [`current_credential`](Self::current_credential) with an explicit clock.
    pub async fn current_credential_at(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Credential, CredentialError> {
        if let Some(credential) = self.fresh(now) {
            return Ok(credential);
        }

        let _guard = self.refresh_lock.lock().await;
        // Another caller may have renewed while we waited.
        if let Some(credential) = self.fresh(now) {
            return Ok(credential);
        }

        debug!("Credential renewal deadline passed");
        self.refresh_at(now).await
    }

    /// Exchange the client credentials for a new token unconditionally.
    pub async fn refresh(&self) -> Result<Credential, CredentialError> {
        self.refresh_at(Utc::now()).await
    }

    /// Force a renewal on the next access, e.g. after the API answered 401.
    pub fn invalidate(&self) {
        if let Some(credential) = self.current.write().as_mut() {
            credential.mark_stale();
            info!("Credential invalidated, renewing on next use");
        }
    }

    fn fresh(&self, now: DateTime<Utc>) -> Option<Credential> {
        self.current
            .read()
            .as_ref()
            .filter(|credential| !credential.needs_renewal(now))
            .cloned()
    }

    #[instrument(skip(self))]
    async fn refresh_at(&self, now: DateTime<Utc>) -> Result<Credential, CredentialError> {
        let token = self.api.request_app_token().await?;
        let credential = Credential::issue(
            now,
            token.access_token,
            token.token_type,
            token.expires_in,
        );

        info!(
            expires_at = %credential.expires_at,
            renew_at = %credential.renew_at,
            "Acquired app access token"
        );

        *self.current.write() = Some(credential.clone());
        Ok(credential)
    }
}
