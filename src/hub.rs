//! Broadcast hub for live subscribers
//!
//! Lifecycle and metric events fan out to any number of connected
//! subscribers over a `tokio::sync::broadcast` channel. Delivery is
//! best-effort and fire-and-forget: publishing with no subscribers is fine,
//! slow subscribers lag and drop messages instead of stalling publishers,
//! and disconnected receivers fall out of the channel on their own. There is
//! no replay buffer — a subscriber only sees events published after it
//! connected.

use chrono::Utc;
use serde_json::{Value, json};
use tokio::sync::broadcast;
use tracing::trace;

use crate::{Alert, Metric, ProbeSource};

/// Default event buffer per subscriber.
const DEFAULT_CAPACITY: usize = 256;

/// Typed event pushed to subscribers.
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    /// Outcome of one probe health check.
    HealthCheck {
        source: ProbeSource,
        healthy: bool,
        response_time_ms: Option<u64>,
        status_code: Option<u16>,
        error: Option<String>,
    },

    /// Normalized metrics written during a cycle.
    MetricsUpdate {
        source: ProbeSource,
        metrics: Vec<Metric>,
    },

    /// A fresh alert passed dedup and was persisted.
    NewAlert(Alert),

    /// A cycle finished (published even when some probes failed).
    CycleComplete { cycle: String },
}

impl MonitorEvent {
    /// Wire type string for this event.
    pub fn event_type(&self) -> String {
        match self {
            MonitorEvent::HealthCheck { .. } => "health_check".to_string(),
            MonitorEvent::MetricsUpdate { .. } => "metrics_update".to_string(),
            MonitorEvent::NewAlert(_) => "new_alert".to_string(),
            MonitorEvent::CycleComplete { cycle } => format!("{cycle}_check_complete"),
        }
    }

    /// Serialize to the subscriber wire shape: `{type, data?, timestamp}`.
    pub fn to_frame(&self) -> Value {
        let data = match self {
            MonitorEvent::HealthCheck {
                source,
                healthy,
                response_time_ms,
                status_code,
                error,
            } => Some(json!({
                "source": source,
                "healthy": healthy,
                "response_time_ms": response_time_ms,
                "status_code": status_code,
                "error": error,
            })),
            MonitorEvent::MetricsUpdate { source, metrics } => Some(json!({
                "source": source,
                "metrics": metrics,
            })),
            MonitorEvent::NewAlert(alert) => Some(json!(alert)),
            MonitorEvent::CycleComplete { .. } => None,
        };

        json!({
            "type": self.event_type(),
            "data": data,
            "timestamp": Utc::now().to_rfc3339(),
        })
    }
}

/// Single fan-out stream over all monitor events.
#[derive(Debug, Clone)]
pub struct EventHub {
    sender: broadcast::Sender<MonitorEvent>,
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all current subscribers.
    ///
    /// Never fails: no subscribers just means nobody was listening.
    pub fn publish(&self, event: MonitorEvent) {
        match self.sender.send(event) {
            Ok(receivers) => trace!("published event to {receivers} subscribers"),
            Err(_) => trace!("no subscribers for event (this is OK)"),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
