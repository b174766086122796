//! Prometheus metrics exporter.
//!
//! Exports the state store in Prometheus text format.

use std::fmt::Write;
use std::sync::Arc;

use crate::state::{ChannelView, StateStore};

pub const DEFAULT_NAMESPACE: &str = "twitch";

type ChannelValue = fn(&ChannelView) -> f64;

/// Per-channel gauge families, in output order.
const CHANNEL_FAMILIES: &[(&str, &str, ChannelValue)] = &[
    ("online", "Whether the channel is live (1) or offline (0)", online),
    ("viewers", "Current viewer count, 0 when offline", viewers),
    (
        "started_at",
        "Unix time the current broadcast started, 0 when offline",
        started_at,
    ),
    ("views", "Total channel views", views),
    ("followers", "Follower count", followers),
];

fn online(channel: &ChannelView) -> f64 {
    if channel.state.online { 1.0 } else { 0.0 }
}

fn viewers(channel: &ChannelView) -> f64 {
    channel.state.viewers as f64
}

fn started_at(channel: &ChannelView) -> f64 {
    channel
        .state
        .up_since
        .map(|t| t.timestamp() as f64)
        .unwrap_or(0.0)
}

fn views(channel: &ChannelView) -> f64 {
    channel.state.total_views as f64
}

fn followers(channel: &ChannelView) -> f64 {
    channel.state.followers as f64
}

/// Prometheus metrics exporter.
pub struct PrometheusExporter {
    store: Arc<StateStore>,
    namespace: String,
}

impl PrometheusExporter {
    /// Create a new Prometheus exporter.
    pub fn new(store: Arc<StateStore>) -> Self {
        Self::with_namespace(store, DEFAULT_NAMESPACE)
    }

    /// Create a new Prometheus exporter with custom namespace.
    pub fn with_namespace(store: Arc<StateStore>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    /// Export metrics in Prometheus text format.
    ///
    /// The store is copied under its read lock first; rendering happens
    /// without holding it.
    pub fn export(&self) -> String {
        let snapshot = self.store.snapshot();
        let mut output = String::new();

        for (name, help, value) in CHANNEL_FAMILIES {
            self.write_header(&mut output, name, help);
            for channel in &snapshot.channels {
                self.write_sample(
                    &mut output,
                    name,
                    &[("name", &channel.record.display_name)],
                    value(channel),
                );
            }
        }

        self.write_gauge(
            &mut output,
            "last_scrape",
            "Unix time of the last completed poll cycle",
            snapshot
                .cycle
                .last_scrape
                .map(|t| t.timestamp() as f64)
                .unwrap_or(0.0),
        );

        self.write_gauge(
            &mut output,
            "token_remaining",
            "Request quota reported at the start of the last poll cycle",
            snapshot.cycle.quota_remaining as f64,
        );

        output
    }

    fn write_gauge(&self, output: &mut String, name: &str, help: &str, value: f64) {
        self.write_header(output, name, help);
        self.write_sample(output, name, &[], value);
    }

    fn write_header(&self, output: &mut String, name: &str, help: &str) {
        let full_name = format!("{}_{}", self.namespace, name);
        let _ = writeln!(output, "# HELP {} {}", full_name, help);
        let _ = writeln!(output, "# TYPE {} gauge", full_name);
    }

    fn write_sample(&self, output: &mut String, name: &str, labels: &[(&str, &str)], value: f64) {
        let full_name = format!("{}_{}", self.namespace, name);
        if labels.is_empty() {
            let _ = writeln!(output, "{} {}", full_name, value);
            return;
        }

        let labels_str = labels
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", k, escape_label_value(v)))
            .collect::<Vec<_>>()
            .join(",");

        let _ = writeln!(output, "{}{{{}}} {}", full_name, labels_str, value);
    }
}

/// Escape a label value per the text exposition format.
fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }
    escaped
}
