//! In-memory store (no persistence)
//!
//! Reference implementation of [`Store`] over a `tokio::sync::RwLock`. All
//! data is lost on restart; the daemon uses it when no external store is
//! wired in, and the test suite builds on it throughout.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::{Alert, AlertStatus, ChannelKind, Metric, MetricStatus, ProbeSource};

use super::error::{StoreError, StoreResult};
use super::Store;

#[derive(Default)]
struct Inner {
    metrics: Vec<Metric>,
    alerts: HashMap<Uuid, Alert>,
}

/// In-memory store backed by a read-write lock.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored metrics. Test/introspection helper.
    pub async fn metric_count(&self) -> usize {
        self.inner.read().await.metrics.len()
    }

    /// Number of stored alerts. Test/introspection helper.
    pub async fn alert_count(&self) -> usize {
        self.inner.read().await.alerts.len()
    }

    /// Snapshot of stored metrics, oldest first. Test/introspection helper.
    pub async fn metrics(&self) -> Vec<Metric> {
        self.inner.read().await.metrics.clone()
    }

    /// Snapshot of stored alerts, unordered. Test/introspection helper.
    pub async fn alerts(&self) -> Vec<Alert> {
        self.inner.read().await.alerts.values().cloned().collect()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn save_metric(&self, metric: Metric) -> StoreResult<Metric> {
        let mut inner = self.inner.write().await;
        inner.metrics.push(metric.clone());
        Ok(metric)
    }

    async fn find_active_alert(
        &self,
        title: &str,
        source: ProbeSource,
        since: DateTime<Utc>,
    ) -> StoreResult<Option<Alert>> {
        let inner = self.inner.read().await;
        let found = inner
            .alerts
            .values()
            .filter(|alert| {
                alert.status == AlertStatus::Active
                    && alert.source == source
                    && alert.title == title
                    && alert.created_at >= since
            })
            .max_by_key(|alert| alert.created_at)
            .cloned();

        Ok(found)
    }

    async fn save_alert(&self, alert: Alert) -> StoreResult<Alert> {
        let mut inner = self.inner.write().await;
        inner.alerts.insert(alert.id, alert.clone());
        Ok(alert)
    }

    async fn get_alert(&self, id: Uuid) -> StoreResult<Alert> {
        let inner = self.inner.read().await;
        inner
            .alerts
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn update_alert_status(
        &self,
        id: Uuid,
        status: AlertStatus,
        actor: Option<String>,
        at: DateTime<Utc>,
    ) -> StoreResult<Alert> {
        let mut inner = self.inner.write().await;
        let alert = inner.alerts.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        alert.status = status;
        match status {
            AlertStatus::Acknowledged => {
                alert.acknowledged_by = actor;
                alert.acknowledged_at = Some(at);
            }
            AlertStatus::Resolved => {
                alert.resolved_at = Some(at);
            }
            AlertStatus::Active => {}
        }

        Ok(alert.clone())
    }

    async fn mark_notified(&self, id: Uuid, channels: Vec<ChannelKind>) -> StoreResult<Alert> {
        let mut inner = self.inner.write().await;
        let alert = inner.alerts.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        alert.notification_sent = true;
        alert.notification_channels = channels;

        Ok(alert.clone())
    }

    async fn delete_metrics_older_than(
        &self,
        cutoff: DateTime<Utc>,
        keep: &[MetricStatus],
    ) -> StoreResult<usize> {
        let mut inner = self.inner.write().await;
        let before = inner.metrics.len();
        inner
            .metrics
            .retain(|m| m.captured_at >= cutoff || keep.contains(&m.status));
        let deleted = before - inner.metrics.len();

        if deleted > 0 {
            debug!("retention sweep removed {deleted} metrics");
        }

        Ok(deleted)
    }

    async fn delete_resolved_alerts_older_than(&self, cutoff: DateTime<Utc>) -> StoreResult<usize> {
        let mut inner = self.inner.write().await;
        let before = inner.alerts.len();
        inner
            .alerts
            .retain(|_, a| a.status != AlertStatus::Resolved || a.created_at >= cutoff);
        let deleted = before - inner.alerts.len();

        if deleted > 0 {
            debug!("retention sweep removed {deleted} resolved alerts");
        }

        Ok(deleted)
    }
}
