//! In-memory state store.
//!
//! One [`ChannelState`] per registered channel, guarded by a single
//! read/write lock together with the metadata of the last poll cycle.
//! The reconciler is the only writer; exposition handlers take cheap
//! snapshots under the read lock.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use helix_client::{StreamRecord, UserRecord};
use parking_lot::RwLock;
use serde::Serialize;

use crate::channel::{ChannelRecord, ChannelRegistry};

/// A live stream observed during one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSnapshot {
    pub channel_id: String,
    pub viewer_count: u64,
    pub started_at: DateTime<Utc>,
    pub title: String,
}

impl From<StreamRecord> for StreamSnapshot {
    fn from(record: StreamRecord) -> Self {
        Self {
            channel_id: record.user_id,
            viewer_count: record.viewer_count,
            started_at: record.started_at,
            title: record.title,
        }
    }
}

/// Last known statistics of a channel.
///
/// `viewers` is zero and `up_since` is `None` whenever `online` is false.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChannelState {
    pub online: bool,
    pub viewers: u64,
    pub up_since: Option<DateTime<Utc>>,
    pub total_views: u64,
    pub followers: u64,
}

impl ChannelState {
    fn set_live(&mut self, stream: &StreamSnapshot) {
        self.online = true;
        self.viewers = stream.viewer_count;
        self.up_since = Some(stream.started_at);
    }

    fn set_offline(&mut self) {
        self.online = false;
        self.viewers = 0;
        self.up_since = None;
    }
}

/// Online/offline change detected while applying a cycle's streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Online {
        channel_id: String,
        title: String,
        viewers: u64,
        started_at: DateTime<Utc>,
    },
    Offline {
        channel_id: String,
    },
}

impl Transition {
    pub fn channel_id(&self) -> &str {
        match self {
            Self::Online { channel_id, .. } | Self::Offline { channel_id } => channel_id,
        }
    }
}

/// Metadata of the most recent poll cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleInfo {
    /// Wall-clock time of the last completed cycle.
    pub last_scrape: Option<DateTime<Utc>>,
    /// Quota reported by the streams call at the start of that cycle.
    pub quota_remaining: u32,
    pub last_cycle_duration_ms: u64,
    pub cycles_completed: u64,
    /// Reason the most recent cycle was aborted, cleared by the next success.
    pub last_error: Option<String>,
}

/// A channel together with its state at snapshot time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelView {
    pub record: ChannelRecord,
    pub state: ChannelState,
}

/// Point-in-time copy of the whole store.
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    /// In registration order.
    pub channels: Vec<ChannelView>,
    pub cycle: CycleInfo,
}

#[derive(Debug, Default)]
struct StoreInner {
    states: HashMap<String, ChannelState>,
    cycle: CycleInfo,
}

/// Shared store of channel statistics.
#[derive(Debug)]
pub struct StateStore {
    registry: Arc<ChannelRegistry>,
    inner: RwLock<StoreInner>,
}

impl StateStore {
    /// Create a store with a default state for every registered channel.
    pub fn new(registry: Arc<ChannelRegistry>) -> Self {
        let states = registry
            .ids()
            .into_iter()
            .map(|id| (id, ChannelState::default()))
            .collect();

        Self {
            registry,
            inner: RwLock::new(StoreInner {
                states,
                cycle: CycleInfo::default(),
            }),
        }
    }

    pub fn registry(&self) -> &Arc<ChannelRegistry> {
        &self.registry
    }

    pub fn get(&self, channel_id: &str) -> Option<ChannelState> {
        self.inner.read().states.get(channel_id).cloned()
    }

    pub fn cycle_info(&self) -> CycleInfo {
        self.inner.read().cycle.clone()
    }

    /// Copy every channel's state and the cycle metadata under one read lock.
    pub fn snapshot(&self) -> StoreSnapshot {
        let inner = self.inner.read();
        let channels = self
            .registry
            .iter()
            .map(|record| ChannelView {
                record: record.clone(),
                state: inner.states.get(&record.id).cloned().unwrap_or_default(),
            })
            .collect();

        StoreSnapshot {
            channels,
            cycle: inner.cycle.clone(),
        }
    }

    /// Full resync of the online flags against this cycle's streams.
    ///
    /// Channels present in `streams` become online with the reported viewers
    /// and start time; every other registered channel is reset to offline.
    /// Streams for unregistered channels are ignored.
    pub fn apply_streams(&self, streams: &[StreamSnapshot]) -> Vec<Transition> {
        let lookup: HashMap<&str, &StreamSnapshot> = streams
            .iter()
            .map(|stream| (stream.channel_id.as_str(), stream))
            .collect();

        let mut transitions = Vec::new();
        let mut inner = self.inner.write();

        for channel in self.registry.iter() {
            let state = inner.states.entry(channel.id.clone()).or_default();
            let was_online = state.online;

            match lookup.get(channel.id.as_str()) {
                Some(stream) => {
                    state.set_live(stream);
                    if !was_online {
                        transitions.push(Transition::Online {
                            channel_id: channel.id.clone(),
                            title: stream.title.clone(),
                            viewers: stream.viewer_count,
                            started_at: stream.started_at,
                        });
                    }
                }
                None => {
                    state.set_offline();
                    if was_online {
                        transitions.push(Transition::Offline {
                            channel_id: channel.id.clone(),
                        });
                    }
                }
            }
        }

        transitions
    }

    /// Update total views from user records matched by id.
    ///
    /// Registered channels without a record keep their last known total.
    /// Returns the number of channels updated.
    pub fn apply_user_totals(&self, users: &[UserRecord]) -> usize {
        let mut inner = self.inner.write();
        let mut updated = 0;
        for user in users {
            if let Some(state) = inner.states.get_mut(&user.id) {
                state.total_views = user.view_count;
                updated += 1;
            }
        }
        updated
    }

    /// Returns false if the channel is not registered.
    pub fn set_followers(&self, channel_id: &str, followers: u64) -> bool {
        match self.inner.write().states.get_mut(channel_id) {
            Some(state) => {
                state.followers = followers;
                true
            }
            None => false,
        }
    }

    /// Record a completed cycle.
    pub fn record_cycle(&self, at: DateTime<Utc>, quota_remaining: u32, duration_ms: u64) {
        let mut inner = self.inner.write();
        inner.cycle.last_scrape = Some(at);
        inner.cycle.quota_remaining = quota_remaining;
        inner.cycle.last_cycle_duration_ms = duration_ms;
        inner.cycle.cycles_completed += 1;
        inner.cycle.last_error = None;
    }

    /// Record an aborted cycle; channel states are left untouched.
    pub fn record_failure(&self, error: impl Into<String>) {
        self.inner.write().cycle.last_error = Some(error.into());
    }
}
