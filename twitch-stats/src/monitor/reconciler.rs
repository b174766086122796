//! Poll-reconcile-budget cycle.
//!
//! One cycle, in strict order:
//! 1. fetch streams for every channel (≤100 per request); the quota reported
//!    by the first response seeds the cycle's [`QuotaBudget`]
//! 2. resync every channel's online state against the fetched streams
//! 3. spend one unit per users request to refresh total views
//! 4. spend what is left above the floor on follower counts, round-robin
//! 5. record cycle metadata
//!
//! A failure in step 1 aborts the cycle and leaves the stored state as is.
//! Failures in steps 3 and 4 only affect the channels involved. A rejected
//! credential in step 3 skips step 4 for the rest of the cycle.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use helix_client::{HelixApi, StreamsPage, UserRecord};
use tracing::{debug, info, instrument, warn};

use crate::channel::ChannelRegistry;
use crate::credentials::CredentialManager;
use crate::state::{StateStore, StreamSnapshot, Transition};
use crate::{Error, Result};

use super::batch::{BatchOutcome, fetch_chunked};
use super::budget::{DEFAULT_QUOTA_FLOOR, QuotaBudget};
use super::events::{MonitorEvent, MonitorEventBroadcaster};
use super::round_robin::RoundRobinCursor;

/// Reconciler settings.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Follower refreshes stop once the budget reaches this value.
    pub quota_floor: u32,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            quota_floor: DEFAULT_QUOTA_FLOOR,
        }
    }
}

/// Summary of a completed cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    /// Quota reported by the first streams response.
    pub quota_at_start: u32,
    /// Budget left after follower spending.
    pub quota_left: u32,
    pub live_channels: usize,
    pub transitions: usize,
    pub users_updated: usize,
    pub follower_fetches: usize,
    /// Channels whose users or follower lookup failed.
    pub failed_lookups: usize,
    pub duration: Duration,
}

/// Owns the poll cycle and the round-robin position.
pub struct Reconciler {
    api: Arc<dyn HelixApi>,
    credentials: Arc<CredentialManager>,
    store: Arc<StateStore>,
    events: MonitorEventBroadcaster,
    cursor: RoundRobinCursor,
    config: ReconcilerConfig,
}

impl Reconciler {
    pub fn new(
        api: Arc<dyn HelixApi>,
        credentials: Arc<CredentialManager>,
        store: Arc<StateStore>,
        events: MonitorEventBroadcaster,
        config: ReconcilerConfig,
    ) -> Self {
        let cursor = RoundRobinCursor::new(store.registry().len());
        Self {
            api,
            credentials,
            store,
            events,
            cursor,
            config,
        }
    }

    /// Resume follower refreshes from a saved position.
    pub fn with_cursor_position(mut self, position: usize) -> Self {
        self.cursor = RoundRobinCursor::restore(position, self.store.registry().len());
        self
    }

    pub fn cursor(&self) -> RoundRobinCursor {
        self.cursor
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    pub fn events(&self) -> &MonitorEventBroadcaster {
        &self.events
    }

    /// Run one full cycle.
    #[instrument(skip(self))]
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        let started = Instant::now();
        let started_at = Utc::now();

        match self.reconcile(started, started_at).await {
            Ok(report) => Ok(report),
            Err(error) => {
                warn!(error = %error, "Poll cycle aborted, keeping previous state");
                self.store.record_failure(error.to_string());
                self.events.publish(MonitorEvent::CycleFailed {
                    error: error.to_string(),
                    timestamp: Utc::now(),
                });
                Err(error)
            }
        }
    }

    async fn reconcile(
        &mut self,
        started: Instant,
        started_at: DateTime<Utc>,
    ) -> Result<CycleReport> {
        let credential = self.credentials.current_credential().await?;
        let token = credential.access_token;
        let registry = Arc::clone(self.store.registry());
        let logins = registry.logins();

        let (streams, mut budget) = self.fetch_streams(&token, &logins).await?;
        debug!(
            live = streams.len(),
            quota = budget.reported(),
            "Fetched streams"
        );

        let transitions = self.store.apply_streams(&streams);
        let transition_count = transitions.len();
        self.publish_transitions(&registry, transitions);

        let (users_updated, failed_users, users_rejected) =
            self.refresh_user_totals(&token, &logins, &mut budget).await;

        let (follower_fetches, failed_followers) = if users_rejected {
            warn!("Credential rejected, skipping follower counts until renewal");
            (0, 0)
        } else {
            self.refresh_followers(&token, &registry, &mut budget).await
        };

        let duration = started.elapsed();
        let duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self.store.record_cycle(started_at, budget.reported(), duration_ms);

        let report = CycleReport {
            started_at,
            quota_at_start: budget.reported(),
            quota_left: budget.remaining(),
            live_channels: streams.len(),
            transitions: transition_count,
            users_updated,
            follower_fetches,
            failed_lookups: failed_users + failed_followers,
            duration,
        };

        info!(
            live = report.live_channels,
            transitions = report.transitions,
            followers = report.follower_fetches,
            quota_start = report.quota_at_start,
            quota_left = report.quota_left,
            duration_ms,
            "Poll cycle complete"
        );

        Ok(report)
    }

    /// Step 1. Every sub-batch must succeed; a partial result would mark the
    /// channels of the failed batch offline.
    async fn fetch_streams(
        &self,
        token: &str,
        logins: &[String],
    ) -> Result<(Vec<StreamSnapshot>, QuotaBudget)> {
        let api = Arc::clone(&self.api);
        let outcome: BatchOutcome<StreamsPage> = fetch_chunked(
            logins,
            |_| true,
            |chunk: &[String]| {
                let api = Arc::clone(&api);
                let token = token.to_string();
                let chunk = chunk.to_vec();
                async move { api.fetch_streams(&token, &chunk).await.map(|page| vec![page]) }
            },
        )
        .await;

        if outcome.any_unauthorized() {
            self.credentials.invalidate();
        }
        if let Some(failure) = outcome.failures.first() {
            return Err(Error::CycleAborted(format!(
                "streams lookup failed for {} of {} channels: {}",
                outcome.failed_ids(),
                logins.len(),
                failure.error
            )));
        }

        let mut pages = outcome.records.into_iter();
        let Some(first) = pages.next() else {
            return Ok((Vec::new(), QuotaBudget::new(0, self.config.quota_floor)));
        };

        // The first response is authoritative; later batches are charged locally.
        let mut budget = QuotaBudget::new(first.remaining_quota, self.config.quota_floor);
        let mut streams: Vec<StreamSnapshot> =
            first.streams.into_iter().map(StreamSnapshot::from).collect();

        for page in pages {
            if let Err(e) = budget.try_spend() {
                debug!(error = %e, "Additional streams batch exceeded the reported quota");
            }
            streams.extend(page.streams.into_iter().map(StreamSnapshot::from));
        }

        Ok((streams, budget))
    }

    fn publish_transitions(&self, registry: &ChannelRegistry, transitions: Vec<Transition>) {
        let now = Utc::now();
        for transition in transitions {
            let display_name = registry
                .get(transition.channel_id())
                .map(|c| c.display_name.clone())
                .unwrap_or_default();

            let event = match transition {
                Transition::Online {
                    channel_id,
                    title,
                    viewers,
                    started_at,
                } => MonitorEvent::ChannelLive {
                    channel_id,
                    display_name,
                    title,
                    viewers,
                    started_at,
                    timestamp: now,
                },
                Transition::Offline { channel_id } => MonitorEvent::ChannelOffline {
                    channel_id,
                    display_name,
                    timestamp: now,
                },
            };

            info!("{}", event.description());
            self.events.publish(event);
        }
    }

    /// Step 3. Returns (channels updated, channels whose lookup failed,
    /// whether the credential was rejected).
    async fn refresh_user_totals(
        &self,
        token: &str,
        logins: &[String],
        budget: &mut QuotaBudget,
    ) -> (usize, usize, bool) {
        let api = Arc::clone(&self.api);
        let outcome: BatchOutcome<UserRecord> = fetch_chunked(
            logins,
            |_| match budget.try_spend() {
                Ok(_) => true,
                Err(e) => {
                    warn!(error = %e, "Skipping user totals refresh");
                    false
                }
            },
            |chunk: &[String]| {
                let api = Arc::clone(&api);
                let token = token.to_string();
                let chunk = chunk.to_vec();
                async move { api.fetch_users(&token, &chunk).await }
            },
        )
        .await;

        for failure in &outcome.failures {
            warn!(
                channels = failure.ids.len(),
                error = %failure.error,
                "User totals lookup failed, keeping previous totals"
            );
        }
        let rejected = outcome.any_unauthorized();
        if rejected {
            self.credentials.invalidate();
        }

        let updated = self.store.apply_user_totals(&outcome.records);
        (updated, outcome.failed_ids(), rejected)
    }

    /// Step 4. Refreshes at most one full rotation of the channel list.
    /// Returns (successful fetches, failed fetches).
    async fn refresh_followers(
        &mut self,
        token: &str,
        registry: &ChannelRegistry,
        budget: &mut QuotaBudget,
    ) -> (usize, usize) {
        let mut fetched = 0;

        while fetched < registry.len() {
            if let Err(e) = budget.try_spend_above_floor() {
                debug!(error = %e, "Follower refresh stopped at quota floor");
                break;
            }

            let Some(channel) = registry.at(self.cursor.current()) else {
                break;
            };

            match self.api.fetch_follower_count(token, &channel.id).await {
                Ok(total) => {
                    self.store.set_followers(&channel.id, total);
                    self.cursor.advance();
                    fetched += 1;
                }
                Err(e) => {
                    warn!(
                        channel = %channel.display_name,
                        error = %e,
                        "Follower count lookup failed, retrying next cycle"
                    );
                    if e.is_unauthorized() {
                        self.credentials.invalidate();
                    }
                    return (fetched, 1);
                }
            }
        }

        (fetched, 0)
    }
}
