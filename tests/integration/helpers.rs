//! Shared fixtures for integration tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use vigil::alerts::{AlertManager, DedupPolicy};
use vigil::hub::EventHub;
use vigil::notify::{ChannelError, ChannelPolicy, Dispatcher, NotifyChannel};
use vigil::probe::{HealthReport, MetricReading, Probe};
use vigil::store::{MemoryStore, Store, StoreError, StoreResult};
use vigil::thresholds::{ThresholdSet, ThresholdSpec};
use vigil::{Alert, AlertStatus, ChannelKind, Metric, MetricStatus, ProbeSource, Severity};

/// Notification channel that counts invocations instead of delivering.
pub struct CountingChannel {
    kind: ChannelKind,
    calls: AtomicUsize,
    fail: bool,
}

impl CountingChannel {
    pub fn new(kind: ChannelKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            calls: AtomicUsize::new(0),
            fail: false,
        })
    }

    pub fn failing(kind: ChannelKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            calls: AtomicUsize::new(0),
            fail: true,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotifyChannel for CountingChannel {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    async fn send(&self, _alert: &Alert) -> Result<(), ChannelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(ChannelError::Transport("simulated failure".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Probe returning a fixed report.
pub struct StaticProbe {
    source: ProbeSource,
    healthy: bool,
    error: Option<String>,
    readings: HashMap<String, f64>,
}

impl StaticProbe {
    pub fn healthy(source: ProbeSource) -> Arc<Self> {
        Arc::new(Self {
            source,
            healthy: true,
            error: None,
            readings: HashMap::new(),
        })
    }

    pub fn failing(source: ProbeSource, error: &str) -> Arc<Self> {
        Arc::new(Self {
            source,
            healthy: false,
            error: Some(error.to_string()),
            readings: HashMap::new(),
        })
    }

    pub fn with_reading(source: ProbeSource, name: &str, value: f64) -> Arc<Self> {
        Arc::new(Self {
            source,
            healthy: true,
            error: None,
            readings: HashMap::from([(name.to_string(), value)]),
        })
    }
}

#[async_trait]
impl Probe for StaticProbe {
    fn source(&self) -> ProbeSource {
        self.source
    }

    async fn check_health(&self) -> HealthReport {
        let mut report = if self.healthy {
            HealthReport::healthy()
        } else {
            HealthReport::unhealthy(self.error.clone().unwrap_or_default())
        };
        report.readings = self.readings.clone();
        report
    }

    async fn metrics(&self) -> Vec<MetricReading> {
        self.readings
            .iter()
            .map(|(name, value)| MetricReading::new(name.clone(), *value))
            .collect()
    }
}

/// Store wrapper whose metric writes always fail, for store-failure paths.
pub struct BrokenMetricStore {
    inner: Arc<MemoryStore>,
}

impl BrokenMetricStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Store for BrokenMetricStore {
    async fn save_metric(&self, _metric: Metric) -> StoreResult<Metric> {
        Err(StoreError::Backend("disk full".to_string()))
    }

    async fn find_active_alert(
        &self,
        title: &str,
        source: ProbeSource,
        since: DateTime<Utc>,
    ) -> StoreResult<Option<Alert>> {
        self.inner.find_active_alert(title, source, since).await
    }

    async fn save_alert(&self, alert: Alert) -> StoreResult<Alert> {
        self.inner.save_alert(alert).await
    }

    async fn get_alert(&self, id: Uuid) -> StoreResult<Alert> {
        self.inner.get_alert(id).await
    }

    async fn update_alert_status(
        &self,
        id: Uuid,
        status: AlertStatus,
        actor: Option<String>,
        at: DateTime<Utc>,
    ) -> StoreResult<Alert> {
        self.inner.update_alert_status(id, status, actor, at).await
    }

    async fn mark_notified(&self, id: Uuid, channels: Vec<ChannelKind>) -> StoreResult<Alert> {
        self.inner.mark_notified(id, channels).await
    }

    async fn delete_metrics_older_than(
        &self,
        cutoff: DateTime<Utc>,
        keep: &[MetricStatus],
    ) -> StoreResult<usize> {
        self.inner.delete_metrics_older_than(cutoff, keep).await
    }

    async fn delete_resolved_alerts_older_than(&self, cutoff: DateTime<Utc>) -> StoreResult<usize> {
        self.inner.delete_resolved_alerts_older_than(cutoff).await
    }
}

/// Threshold table with the standard CPU pair used across scenarios.
pub fn cpu_thresholds() -> ThresholdSet {
    let mut spec = ThresholdSpec::new(80.0, 90.0);
    spec.title = Some("High CPU Usage".to_string());
    spec.category = Some("resource".to_string());
    spec.unit = Some("%".to_string());
    ThresholdSet::new(HashMap::from([("cpu_usage".to_string(), spec)]))
}

pub fn all_severities() -> Vec<Severity> {
    vec![
        Severity::Info,
        Severity::Warning,
        Severity::Error,
        Severity::Critical,
    ]
}

/// Fully wired core over an in-memory store and one counting channel.
pub struct World {
    pub store: Arc<MemoryStore>,
    pub hub: EventHub,
    pub alerts: Arc<AlertManager>,
    pub channel: Arc<CountingChannel>,
}

pub fn world(dedup: DedupPolicy, rate_limit: Duration) -> World {
    let store = Arc::new(MemoryStore::new());
    let channel = CountingChannel::new(ChannelKind::Webhook);
    let dispatcher = Arc::new(
        Dispatcher::new(rate_limit)
            .register(ChannelPolicy::new(true, all_severities()), channel.clone()),
    );
    let hub = EventHub::default();
    let alerts = Arc::new(AlertManager::new(
        store.clone(),
        dispatcher,
        hub.clone(),
        dedup,
    ));

    World {
        store,
        hub,
        alerts,
        channel,
    }
}
