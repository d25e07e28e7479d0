//! Alert lifecycle management
//!
//! The manager owns the alert state machine and the dedup check in front of
//! it. A raised candidate either matches an existing **active** alert inside
//! the dedup window — suppressed, nothing written, nothing notified — or
//! becomes a fresh record that is persisted, dispatched, and announced on
//! the hub.
//!
//! ## State machine
//!
//! ```text
//! active ──► acknowledged ──► resolved
//!    └──────────────────────────┘
//! ```
//!
//! Transitions only move forward; resolved is terminal. Repeating an
//! operation that already happened is a no-op returning the current record,
//! so retried operator calls stay idempotent.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::hub::{EventHub, MonitorEvent};
use crate::notify::Dispatcher;
use crate::store::{Store, StoreResult};
use crate::{Alert, AlertStatus, ProbeSource, Severity};

/// What a cycle hands over when a breach needs operator attention.
#[derive(Debug, Clone)]
pub struct AlertCandidate {
    pub title: String,
    pub message: String,
    pub severity: Severity,
    pub source: ProbeSource,
    pub category: Option<String>,
    pub metric_value: Option<f64>,
    pub threshold: Option<f64>,
    pub metadata: HashMap<String, String>,
}

impl AlertCandidate {
    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        severity: Severity,
        source: ProbeSource,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            severity,
            source,
            category: None,
            metric_value: None,
            threshold: None,
            metadata: HashMap::new(),
        }
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn metric(mut self, value: f64, threshold: Option<f64>) -> Self {
        self.metric_value = Some(value);
        self.threshold = threshold;
        self
    }
}

/// Centralized dedup windows: one default plus per-category overrides.
///
/// Call sites never pick a window themselves; slow-changing categories
/// (certificate expiry, plugin scans) get their longer window here.
#[derive(Debug, Clone)]
pub struct DedupPolicy {
    default_window: Duration,
    categories: HashMap<String, Duration>,
}

impl DedupPolicy {
    pub fn new(default_window: Duration) -> Self {
        Self {
            default_window,
            categories: HashMap::new(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>, window: Duration) -> Self {
        self.categories.insert(category.into(), window);
        self
    }

    pub fn window_for(&self, category: Option<&str>) -> Duration {
        category
            .and_then(|c| self.categories.get(c))
            .copied()
            .unwrap_or(self.default_window)
    }
}

impl Default for DedupPolicy {
    fn default() -> Self {
        Self::new(Duration::hours(1))
    }
}

/// Result of [`AlertManager::raise`]. Suppression is an expected outcome,
/// not a failure, and stays distinguishable from one.
#[derive(Debug, Clone)]
pub enum RaiseOutcome {
    /// A fresh alert was persisted and dispatched.
    Created(Alert),

    /// An active alert with the same (title, source) already existed within
    /// the dedup window; no record was written, nothing was notified.
    Suppressed(Alert),
}

impl RaiseOutcome {
    pub fn alert(&self) -> &Alert {
        match self {
            RaiseOutcome::Created(alert) | RaiseOutcome::Suppressed(alert) => alert,
        }
    }

    pub fn is_suppressed(&self) -> bool {
        matches!(self, RaiseOutcome::Suppressed(_))
    }
}

/// Deduplicates, creates, and transitions alert records.
pub struct AlertManager {
    store: Arc<dyn Store>,
    dispatcher: Arc<Dispatcher>,
    hub: EventHub,
    dedup: DedupPolicy,
}

impl AlertManager {
    pub fn new(
        store: Arc<dyn Store>,
        dispatcher: Arc<Dispatcher>,
        hub: EventHub,
        dedup: DedupPolicy,
    ) -> Self {
        Self {
            store,
            dispatcher,
            hub,
            dedup,
        }
    }

    /// Raise a candidate alert.
    ///
    /// Order matters: the record is persisted as `active` first, then the
    /// dispatcher runs, then the attempted channel set lands on the record,
    /// then the hub hears about it. A store failure anywhere surfaces to the
    /// cycle, which logs and moves on — the next cycle produces a fresh
    /// candidate.
    #[instrument(skip(self, candidate), fields(title = %candidate.title, source = %candidate.source))]
    pub async fn raise(&self, candidate: AlertCandidate) -> StoreResult<RaiseOutcome> {
        let window = self.dedup.window_for(candidate.category.as_deref());
        let since = Utc::now() - window;

        if let Some(existing) = self
            .store
            .find_active_alert(&candidate.title, candidate.source, since)
            .await?
        {
            debug!(
                outcome = "duplicate_suppressed",
                existing_id = %existing.id,
                "active alert exists within dedup window"
            );
            return Ok(RaiseOutcome::Suppressed(existing));
        }

        let alert = Alert {
            id: Uuid::new_v4(),
            title: candidate.title,
            message: candidate.message,
            severity: candidate.severity,
            source: candidate.source,
            category: candidate.category,
            status: AlertStatus::Active,
            metric_value: candidate.metric_value,
            threshold: candidate.threshold,
            metadata: candidate.metadata,
            notification_sent: false,
            notification_channels: Vec::new(),
            acknowledged_by: None,
            acknowledged_at: None,
            resolved_at: None,
            created_at: Utc::now(),
        };

        let alert = self.store.save_alert(alert).await?;
        info!(alert_id = %alert.id, severity = %alert.severity, "raised new alert");

        let outcomes = self.dispatcher.dispatch(&alert).await;
        let attempted = Dispatcher::attempted_channels(&outcomes);
        let alert = self.store.mark_notified(alert.id, attempted).await?;

        self.hub.publish(MonitorEvent::NewAlert(alert.clone()));

        Ok(RaiseOutcome::Created(alert))
    }

    /// Acknowledge an active alert, recording the actor and timestamp.
    ///
    /// Fails with `NotFound` for unknown ids. On an already-acknowledged or
    /// resolved alert this is a no-op returning the current record.
    #[instrument(skip(self))]
    pub async fn acknowledge(&self, id: Uuid, actor: &str) -> StoreResult<Alert> {
        let current = self.store.get_alert(id).await?;

        if !current.status.can_transition_to(AlertStatus::Acknowledged) {
            debug!(status = ?current.status, "acknowledge is a no-op");
            return Ok(current);
        }

        self.store
            .update_alert_status(
                id,
                AlertStatus::Acknowledged,
                Some(actor.to_string()),
                Utc::now(),
            )
            .await
    }

    /// Resolve an alert from `active` or `acknowledged`.
    ///
    /// No-op if already resolved; `resolved_at` is never overwritten.
    #[instrument(skip(self))]
    pub async fn resolve(&self, id: Uuid) -> StoreResult<Alert> {
        let current = self.store.get_alert(id).await?;

        if !current.status.can_transition_to(AlertStatus::Resolved) {
            debug!(status = ?current.status, "resolve is a no-op");
            return Ok(current);
        }

        self.store
            .update_alert_status(id, AlertStatus::Resolved, None, Utc::now())
            .await
    }
}
