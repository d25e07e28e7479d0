pub mod alerts;
pub mod config;
pub mod cycles;
pub mod hub;
pub mod notify;
pub mod probe;
pub mod scheduler;
pub mod store;
pub mod thresholds;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One monitored source. Every probe reports for exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeSource {
    /// Public site uptime
    Site,
    /// Storefront API
    Storefront,
    /// Compute node health
    Node,
    /// CDN / analytics backend
    Analytics,
}

impl std::fmt::Display for ProbeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeSource::Site => write!(f, "site"),
            ProbeSource::Storefront => write!(f, "storefront"),
            ProbeSource::Node => write!(f, "node"),
            ProbeSource::Analytics => write!(f, "analytics"),
        }
    }
}

/// Status derived from the threshold evaluator. Never set ad hoc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricStatus {
    Normal,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl From<MetricStatus> for Severity {
    fn from(status: MetricStatus) -> Self {
        match status {
            MetricStatus::Normal => Severity::Info,
            MetricStatus::Warning => Severity::Warning,
            MetricStatus::Critical => Severity::Critical,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// Alert lifecycle state.
///
/// Transitions only move forward: active → acknowledged → resolved, or
/// active → resolved directly. Resolved is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Active,
    Acknowledged,
    Resolved,
}

impl AlertStatus {
    pub fn can_transition_to(self, next: AlertStatus) -> bool {
        matches!(
            (self, next),
            (AlertStatus::Active, AlertStatus::Acknowledged)
                | (AlertStatus::Active, AlertStatus::Resolved)
                | (AlertStatus::Acknowledged, AlertStatus::Resolved)
        )
    }
}

/// A notification transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Email,
    Chat,
    Webhook,
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelKind::Email => write!(f, "email"),
            ChannelKind::Chat => write!(f, "chat"),
            ChannelKind::Webhook => write!(f, "webhook"),
        }
    }
}

/// One normalized reading from a probe cycle. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metric {
    pub source: ProbeSource,
    pub category: String,
    pub name: String,
    pub value: f64,
    pub unit: Option<String>,
    pub status: MetricStatus,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub captured_at: DateTime<Utc>,
}

impl Metric {
    /// Booleans are stored as 0.0/1.0 so every reading shares one value type.
    pub fn flag(value: bool) -> f64 {
        if value { 1.0 } else { 0.0 }
    }
}

/// An operator-visible alert record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    pub severity: Severity,
    pub source: ProbeSource,
    pub category: Option<String>,
    pub status: AlertStatus,
    pub metric_value: Option<f64>,
    pub threshold: Option<f64>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub notification_sent: bool,
    #[serde(default)]
    pub notification_channels: Vec<ChannelKind>,
    pub acknowledged_by: Option<String>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Alert {
    /// Dedup / rate-limit key for this alert.
    pub fn dedup_key(&self) -> String {
        format!("{}:{}", self.source, self.title)
    }
}
