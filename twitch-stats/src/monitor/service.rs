//! Periodic driver of the reconciler.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::events::MonitorEventBroadcaster;
use super::reconciler::Reconciler;

/// Default delay between the end of one cycle and the start of the next.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Configuration for the stats monitor.
#[derive(Debug, Clone)]
pub struct StatsMonitorConfig {
    pub poll_interval: Duration,
}

impl Default for StatsMonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Runs one cycle immediately, then one per poll interval until cancelled.
///
/// A cycle in progress is allowed to finish; cancellation is observed while
/// waiting for the next one.
pub struct StatsMonitor {
    reconciler: Reconciler,
    config: StatsMonitorConfig,
}

impl StatsMonitor {
    pub fn new(reconciler: Reconciler, config: StatsMonitorConfig) -> Self {
        Self { reconciler, config }
    }

    /// Subscribe-able handle for transition events.
    pub fn event_broadcaster(&self) -> MonitorEventBroadcaster {
        self.reconciler.events().clone()
    }

    /// Spawn the poll loop. The handle yields the reconciler back once the
    /// loop exits, so its cursor can be persisted or inspected.
    pub fn start(self, cancellation_token: CancellationToken) -> JoinHandle<Reconciler> {
        tokio::spawn(self.run(cancellation_token))
    }

    pub async fn run(mut self, cancellation_token: CancellationToken) -> Reconciler {
        info!(
            channels = self.reconciler.store().registry().len(),
            interval_secs = self.config.poll_interval.as_secs(),
            "Stats monitor started"
        );

        loop {
            if cancellation_token.is_cancelled() {
                break;
            }

            // Failures are recorded on the store and logged by the reconciler.
            if let Err(e) = self.reconciler.run_cycle().await {
                debug!(error = %e, "Cycle ended with error");
            }

            tokio::select! {
                biased;

                _ = cancellation_token.cancelled() => break,
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        info!(
            cursor = self.reconciler.cursor().current(),
            "Stats monitor stopped"
        );
        self.reconciler
    }
}
