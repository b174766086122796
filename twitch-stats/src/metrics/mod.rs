//! Metrics exposition.
//!
//! Renders the state store in the Prometheus text format, one gauge series
//! per channel and field labeled by display name, plus process-wide gauges
//! for the last scrape time and the last observed quota.

mod prometheus;

pub use prometheus::{DEFAULT_NAMESPACE, PrometheusExporter};
