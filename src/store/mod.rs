//! Durable storage for metrics and alerts
//!
//! This module provides a trait-based abstraction over the backing store.
//! Metrics are append-only; alerts carry mutable lifecycle state. The core
//! never talks to a database directly — persistence internals live behind
//! [`Store`], and the crate ships an in-memory reference implementation used
//! by the daemon default config and the test suite.
//!
//! ## Design
//!
//! - **Trait-based**: `Store` allows swapping implementations
//! - **Async**: all operations are async for compatibility with Tokio
//! - **Lifecycle-aware**: alert updates go through typed status operations,
//!   not free-form record writes

pub mod error;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Alert, AlertStatus, ChannelKind, Metric, MetricStatus, ProbeSource};

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;

/// Trait for metric/alert persistence backends.
///
/// Implementations must be `Send + Sync` as they are shared across cycle
/// tasks. A write failure is reported to the caller and otherwise dropped —
/// the next scheduled cycle produces fresh data, so nothing retries in-line.
#[async_trait]
pub trait Store: Send + Sync {
    /// Append one normalized metric reading.
    async fn save_metric(&self, metric: Metric) -> StoreResult<Metric>;

    /// Find an **active** alert with the given (title, source) created at or
    /// after `since`. Used by the dedup check before raising.
    async fn find_active_alert(
        &self,
        title: &str,
        source: ProbeSource,
        since: DateTime<Utc>,
    ) -> StoreResult<Option<Alert>>;

    /// Persist a new alert record.
    async fn save_alert(&self, alert: Alert) -> StoreResult<Alert>;

    /// Fetch an alert by id.
    async fn get_alert(&self, id: Uuid) -> StoreResult<Alert>;

    /// Write a status transition.
    ///
    /// `actor` is recorded as `acknowledged_by` for acknowledgements; `at`
    /// lands in `acknowledged_at` or `resolved_at` depending on the target
    /// status. The transition itself is validated by the caller.
    async fn update_alert_status(
        &self,
        id: Uuid,
        status: AlertStatus,
        actor: Option<String>,
        at: DateTime<Utc>,
    ) -> StoreResult<Alert>;

    /// Record that notification delivery was attempted for every eligible
    /// channel. Sets `notification_sent` and the attempted channel set.
    async fn mark_notified(&self, id: Uuid, channels: Vec<ChannelKind>) -> StoreResult<Alert>;

    /// Delete metrics captured before `cutoff`, except those whose status is
    /// in `keep` (critical readings are preserved longer). Returns the number
    /// of metrics deleted.
    async fn delete_metrics_older_than(
        &self,
        cutoff: DateTime<Utc>,
        keep: &[MetricStatus],
    ) -> StoreResult<usize>;

    /// Delete resolved alerts created before `cutoff`. Active and
    /// acknowledged alerts are never swept. Returns the number deleted.
    async fn delete_resolved_alerts_older_than(&self, cutoff: DateTime<Utc>) -> StoreResult<usize>;
}
