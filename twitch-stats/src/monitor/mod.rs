//! Channel stats monitor.
//!
//! - [`Reconciler`]: one poll-reconcile-budget cycle against the Helix API
//! - [`StatsMonitor`]: runs the reconciler on a fixed interval until cancelled
//! - [`QuotaBudget`] and [`RoundRobinCursor`]: spending policy for the
//!   low-priority follower lookups
//! - [`MonitorEventBroadcaster`]: online/offline transition events

mod batch;
mod budget;
mod events;
mod reconciler;
mod round_robin;
mod service;

pub use batch::{BatchFailure, BatchOutcome, fetch_chunked};
pub use budget::{DEFAULT_QUOTA_FLOOR, QuotaBudget, QuotaExhausted};
pub use events::{MonitorEvent, MonitorEventBroadcaster};
pub use reconciler::{CycleReport, Reconciler, ReconcilerConfig};
pub use round_robin::RoundRobinCursor;
pub use service::{DEFAULT_POLL_INTERVAL, StatsMonitor, StatsMonitorConfig};
