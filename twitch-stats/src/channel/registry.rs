//! Channel registry.
//!
//! Maps the operator-supplied logins to stable platform user ids and
//! display names. The registry is immutable once resolved.

use std::collections::{HashMap, HashSet};

use helix_client::{HelixApi, UserRecord, chunk_batches};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{Error, Result};

/// A resolved channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRecord {
    /// Platform user id.
    pub id: String,
    pub login: String,
    pub display_name: String,
}

impl From<UserRecord> for ChannelRecord {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            login: user.login,
            display_name: user.display_name,
        }
    }
}

/// Trim, lowercase and de-duplicate logins, keeping the first occurrence.
pub fn normalize_logins<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    raw.into_iter()
        .map(|login| login.as_ref().trim().to_lowercase())
        .filter(|login| !login.is_empty())
        .filter(|login| seen.insert(login.clone()))
        .collect()
}

/// Ordered, immutable set of tracked channels.
#[derive(Debug, Clone, Default)]
pub struct ChannelRegistry {
    channels: Vec<ChannelRecord>,
    index: HashMap<String, usize>,
}

impl ChannelRegistry {
    /// Build a registry from already resolved records. Duplicate ids are dropped.
    pub fn new(records: impl IntoIterator<Item = ChannelRecord>) -> Self {
        let mut channels = Vec::new();
        let mut index = HashMap::new();

        for record in records {
            if index.contains_key(&record.id) {
                continue;
            }
            index.insert(record.id.clone(), channels.len());
            channels.push(record);
        }

        Self { channels, index }
    }

    /// Resolve `logins` to user records through the users endpoint.
    ///
    /// Unknown logins are skipped with a warning. Any failed lookup, or a
    /// result with no channels at all, is an error.
    pub async fn resolve(api: &dyn HelixApi, token: &str, logins: &[String]) -> Result<Self> {
        let logins = normalize_logins(logins);
        if logins.is_empty() {
            return Err(Error::resolution("no channels configured"));
        }

        let mut found: HashMap<String, UserRecord> = HashMap::new();
        for chunk in chunk_batches(&logins) {
            let users = api.fetch_users(token, chunk).await.map_err(|e| {
                Error::resolution(format!("users lookup for {} logins failed: {e}", chunk.len()))
            })?;
            debug!(requested = chunk.len(), found = users.len(), "Resolved channel batch");
            for user in users {
                found.insert(user.login.to_lowercase(), user);
            }
        }

        let mut records = Vec::with_capacity(logins.len());
        for login in &logins {
            match found.remove(login) {
                Some(user) => records.push(ChannelRecord::from(user)),
                None => warn!(login = %login, "Channel not found on platform, skipping"),
            }
        }

        if records.is_empty() {
            return Err(Error::resolution("none of the configured channels exist"));
        }

        let registry = Self::new(records);
        info!(channels = registry.len(), "Channel registry resolved");
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&ChannelRecord> {
        self.index.get(id).map(|&i| &self.channels[i])
    }

    /// Channel at `position` in registration order.
    pub fn at(&self, position: usize) -> Option<&ChannelRecord> {
        self.channels.get(position)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChannelRecord> {
        self.channels.iter()
    }

    pub fn ids(&self) -> Vec<String> {
        self.channels.iter().map(|c| c.id.clone()).collect()
    }

    pub fn logins(&self) -> Vec<String> {
        self.channels.iter().map(|c| c.login.clone()).collect()
    }
}
