//! Core credential types.

use chrono::{DateTime, Duration, Utc};

/// Upper bound applied to server-reported lifetimes.
const MAX_LIFETIME_SECS: u64 = 365 * 24 * 60 * 60;

/// A bearer credential and its lifetime.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub token_type: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Midpoint between issuance and expiry.
    pub renew_at: DateTime<Utc>,
}

impl Credential {
    /// Build a credential issued at `now` that is valid for `expires_in_secs`.
    pub fn issue(
        now: DateTime<Utc>,
        access_token: impl Into<String>,
        token_type: impl Into<String>,
        expires_in_secs: u64,
    ) -> Self {
        let lifetime = Duration::seconds(expires_in_secs.min(MAX_LIFETIME_SECS) as i64);
        let expires_at = now + lifetime;
        let renew_at = now + (expires_at - now) / 2;

        Self {
            access_token: access_token.into(),
            token_type: token_type.into(),
            issued_at: now,
            expires_at,
            renew_at,
        }
    }

    /// Whether the renewal deadline has been reached.
    #[inline]
    pub fn needs_renewal(&self, now: DateTime<Utc>) -> bool {
        now >= self.renew_at
    }

    #[inline]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Force renewal on the next access.
    pub(crate) fn mark_stale(&mut self) {
        self.renew_at = self.issued_at;
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .field("renew_at", &self.renew_at)
            .finish()
    }
}
