//! Monitor events.
//!
//! Emitted by the reconciler when a channel changes between online and
//! offline, and when a cycle is aborted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Events emitted by the stats monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorEvent {
    /// Channel went live.
    ChannelLive {
        channel_id: String,
        display_name: String,
        title: String,
        viewers: u64,
        started_at: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },
    /// Channel went offline.
    ChannelOffline {
        channel_id: String,
        display_name: String,
        timestamp: DateTime<Utc>,
    },
    /// A cycle was aborted before reconciliation; prior state is retained.
    CycleFailed {
        error: String,
        timestamp: DateTime<Utc>,
    },
}

impl MonitorEvent {
    /// Get a human-readable description of the event.
    pub fn description(&self) -> String {
        match self {
            MonitorEvent::ChannelLive {
                display_name,
                title,
                viewers,
                ..
            } => format!("{} is now live: {} ({} viewers)", display_name, title, viewers),
            MonitorEvent::ChannelOffline { display_name, .. } => {
                format!("{} went offline", display_name)
            }
            MonitorEvent::CycleFailed { error, .. } => format!("poll cycle failed: {}", error),
        }
    }
}

/// Broadcaster for monitor events.
#[derive(Clone)]
pub struct MonitorEventBroadcaster {
    sender: broadcast::Sender<MonitorEvent>,
}

impl MonitorEventBroadcaster {
    /// Create a new broadcaster with default capacity (256).
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.sender.subscribe()
    }

    /// Publish an event; returns the number of receivers reached.
    pub fn publish(&self, event: MonitorEvent) -> usize {
        // No subscribers is not an error.
        self.sender.send(event).unwrap_or(0)
    }
}

impl Default for MonitorEventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_description() {
        let event = MonitorEvent::ChannelLive {
            channel_id: "123".to_string(),
            display_name: "Streamer".to_string(),
            title: "Speedruns".to_string(),
            viewers: 42,
            started_at: Utc::now(),
            timestamp: Utc::now(),
        };
        assert_eq!(event.description(), "Streamer is now live: Speedruns (42 viewers)");
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = MonitorEvent::ChannelOffline {
            channel_id: "123".to_string(),
            display_name: "Streamer".to_string(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"channel_offline""#));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let broadcaster = MonitorEventBroadcaster::new();
        let event = MonitorEvent::CycleFailed {
            error: "boom".to_string(),
            timestamp: Utc::now(),
        };
        assert_eq!(broadcaster.publish(event.clone()), 0);

        let mut rx = broadcaster.subscribe();
        assert_eq!(broadcaster.publish(event.clone()), 1);
        assert_eq!(rx.recv().await.unwrap(), event);
    }
}
