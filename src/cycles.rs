//! Scheduled probe cycles
//!
//! A [`ProbeCycle`] is one scheduled unit of work: run every probe of the
//! cycle concurrently, convert the outcomes into normalized metrics via the
//! threshold evaluator, persist them, raise alerts for breaches, and push
//! events to the hub. Probes are independent — a failing or timed-out probe
//! yields a failure outcome for its source while the others proceed, and the
//! cycle completion event is published regardless.
//!
//! ## Data flow
//!
//! ```text
//! Scheduler tick → probes (concurrent, per-probe timeout)
//!       → ThresholdSet → Store (metrics)
//!       → AlertManager (on breach) → Hub (events + completion marker)
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use tokio::time::timeout;
use tracing::{debug, error, instrument, warn};

use crate::alerts::{AlertCandidate, AlertManager, RaiseOutcome};
use crate::hub::{EventHub, MonitorEvent};
use crate::probe::{HealthReport, MetricReading, Probe};
use crate::scheduler::CycleTask;
use crate::store::Store;
use crate::thresholds::ThresholdSet;
use crate::{Metric, MetricStatus, ProbeSource, Severity};

/// Default per-probe timeout for health checks.
const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default per-probe timeout for deep metric collection (analytics-style
/// calls are slower).
const DEFAULT_METRICS_TIMEOUT: Duration = Duration::from_secs(30);

/// Human-facing label for alert titles.
fn source_label(source: ProbeSource) -> &'static str {
    match source {
        ProbeSource::Site => "Site",
        ProbeSource::Storefront => "Storefront",
        ProbeSource::Node => "Compute Node",
        ProbeSource::Analytics => "Analytics",
    }
}

/// What a probe cycle consumes from its probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleMode {
    /// Health snapshots via [`Probe::check_health`].
    Health,

    /// Deep metric readings via [`Probe::metrics`].
    Metrics,
}

/// One scheduled group of probes plus evaluation and persistence.
pub struct ProbeCycle {
    name: String,
    mode: CycleMode,
    probes: Vec<Arc<dyn Probe>>,
    thresholds: ThresholdSet,
    store: Arc<dyn Store>,
    alerts: Arc<AlertManager>,
    hub: EventHub,
    probe_timeout: Duration,
}

impl ProbeCycle {
    pub fn health(
        name: impl Into<String>,
        probes: Vec<Arc<dyn Probe>>,
        thresholds: ThresholdSet,
        store: Arc<dyn Store>,
        alerts: Arc<AlertManager>,
        hub: EventHub,
    ) -> Self {
        Self {
            name: name.into(),
            mode: CycleMode::Health,
            probes,
            thresholds,
            store,
            alerts,
            hub,
            probe_timeout: DEFAULT_HEALTH_TIMEOUT,
        }
    }

    pub fn metrics(
        name: impl Into<String>,
        probes: Vec<Arc<dyn Probe>>,
        thresholds: ThresholdSet,
        store: Arc<dyn Store>,
        alerts: Arc<AlertManager>,
        hub: EventHub,
    ) -> Self {
        Self {
            name: name.into(),
            mode: CycleMode::Metrics,
            probes,
            thresholds,
            store,
            alerts,
            hub,
            probe_timeout: DEFAULT_METRICS_TIMEOUT,
        }
    }

    pub fn with_probe_timeout(mut self, probe_timeout: Duration) -> Self {
        self.probe_timeout = probe_timeout;
        self
    }

    async fn run_health(&self) {
        let reports = join_all(self.probes.iter().map(|probe| {
            let source = probe.source();
            async move {
                let report = match timeout(self.probe_timeout, probe.check_health()).await {
                    Ok(report) => report,
                    Err(_) => {
                        warn!("probe {source} timed out after {:?}", self.probe_timeout);
                        HealthReport::unhealthy(format!(
                            "probe timed out after {}s",
                            self.probe_timeout.as_secs()
                        ))
                    }
                };
                (source, report)
            }
        }))
        .await;

        for (source, report) in reports {
            self.process_health(source, report).await;
        }
    }

    async fn process_health(&self, source: ProbeSource, report: HealthReport) {
        self.hub.publish(MonitorEvent::HealthCheck {
            source,
            healthy: report.healthy,
            response_time_ms: report.response_time_ms,
            status_code: report.status_code,
            error: report.error.clone(),
        });

        // Availability reading first: probe failures are data, not gaps
        let up_status = if report.healthy {
            MetricStatus::Normal
        } else {
            MetricStatus::Critical
        };
        self.persist_metric(Metric {
            source,
            category: "availability".to_string(),
            name: "up".to_string(),
            value: Metric::flag(report.healthy),
            unit: None,
            status: up_status,
            metadata: report
                .error
                .as_ref()
                .map(|e| std::collections::HashMap::from([("error".to_string(), e.clone())]))
                .unwrap_or_default(),
            captured_at: report.timestamp,
        })
        .await;

        if !report.healthy {
            let message = report
                .error
                .clone()
                .unwrap_or_else(|| "health check failed".to_string());
            self.raise_breach(
                AlertCandidate::new(
                    format!("{} Down", source_label(source)),
                    message,
                    Severity::Critical,
                    source,
                )
                .category("availability"),
            )
            .await;
        }

        if let Some(response_time) = report.response_time_ms {
            self.evaluate_and_persist(source, "response_time_ms", response_time as f64, report.timestamp)
                .await;
        }

        for (name, value) in &report.readings {
            self.evaluate_and_persist(source, name, *value, report.timestamp)
                .await;
        }
    }

    async fn run_metrics(&self) {
        let collected = join_all(self.probes.iter().map(|probe| {
            let source = probe.source();
            async move {
                let readings = match timeout(self.probe_timeout, probe.metrics()).await {
                    Ok(readings) => readings,
                    Err(_) => {
                        warn!("metrics probe {source} timed out after {:?}", self.probe_timeout);
                        Vec::new()
                    }
                };
                (source, readings)
            }
        }))
        .await;

        for (source, readings) in collected {
            self.process_readings(source, readings).await;
        }
    }

    async fn process_readings(&self, source: ProbeSource, readings: Vec<MetricReading>) {
        let mut written = Vec::with_capacity(readings.len());
        let captured_at = Utc::now();

        for reading in readings {
            if let Some(metric) = self
                .evaluate_and_persist(source, &reading.name, reading.current, captured_at)
                .await
            {
                written.push(metric);
            }
        }

        if !written.is_empty() {
            self.hub.publish(MonitorEvent::MetricsUpdate {
                source,
                metrics: written,
            });
        }
    }

    /// Evaluate one reading, persist it, and raise on breach.
    ///
    /// Returns the stored metric, or `None` when the store rejected the
    /// write (logged; the next cycle produces a fresh reading).
    async fn evaluate_and_persist(
        &self,
        source: ProbeSource,
        name: &str,
        value: f64,
        captured_at: chrono::DateTime<Utc>,
    ) -> Option<Metric> {
        let spec = self.thresholds.spec(name);
        let status = spec
            .map(|s| s.evaluate(value))
            .unwrap_or(MetricStatus::Normal);

        let metric = Metric {
            source,
            category: spec
                .and_then(|s| s.category.clone())
                .unwrap_or_else(|| "resource".to_string()),
            name: name.to_string(),
            value,
            unit: spec.and_then(|s| s.unit.clone()),
            status,
            metadata: Default::default(),
            captured_at,
        };

        let stored = self.persist_metric(metric).await;

        if status != MetricStatus::Normal
            && let Some(spec) = spec
        {
            let title = spec
                .title
                .clone()
                .unwrap_or_else(|| format!("{name} threshold breached"));
            let boundary = spec.boundary_for(status);
            let message = match boundary {
                Some(boundary) => format!(
                    "{name} at {value:.1} (threshold {boundary:.1}) on {}",
                    source_label(source)
                ),
                None => format!("{name} at {value:.1} on {}", source_label(source)),
            };

            let mut candidate =
                AlertCandidate::new(title, message, Severity::from(status), source)
                    .metric(value, boundary);
            if let Some(category) = &spec.category {
                candidate = candidate.category(category.clone());
            }

            self.raise_breach(candidate).await;
        }

        stored
    }

    async fn persist_metric(&self, metric: Metric) -> Option<Metric> {
        match self.store.save_metric(metric).await {
            Ok(metric) => Some(metric),
            Err(e) => {
                // reading is lost; the next scheduled cycle writes fresh data
                error!("failed to persist metric: {e}");
                None
            }
        }
    }

    async fn raise_breach(&self, candidate: AlertCandidate) {
        match self.alerts.raise(candidate).await {
            Ok(RaiseOutcome::Created(alert)) => {
                debug!(alert_id = %alert.id, "cycle raised alert");
            }
            Ok(RaiseOutcome::Suppressed(existing)) => {
                debug!(alert_id = %existing.id, "breach suppressed by dedup window");
            }
            Err(e) => {
                error!("failed to raise alert: {e}");
            }
        }
    }
}

#[async_trait]
impl CycleTask for ProbeCycle {
    #[instrument(skip(self), fields(cycle = %self.name))]
    async fn run(&self) -> anyhow::Result<()> {
        debug!("cycle starting with {} probes", self.probes.len());

        match self.mode {
            CycleMode::Health => self.run_health().await,
            CycleMode::Metrics => self.run_metrics().await,
        }

        // published even when probes failed: subscribers track cycle liveness
        self.hub.publish(MonitorEvent::CycleComplete {
            cycle: self.name.clone(),
        });

        Ok(())
    }
}

/// Sweeps the retention horizon: old non-critical metrics go first, critical
/// metrics are kept longer, resolved alerts age out on their own clock.
pub struct RetentionCycle {
    store: Arc<dyn Store>,
    metric_max_age: chrono::Duration,
    critical_metric_max_age: chrono::Duration,
    resolved_alert_max_age: chrono::Duration,
}

impl RetentionCycle {
    pub fn new(
        store: Arc<dyn Store>,
        metric_max_age: chrono::Duration,
        critical_metric_max_age: chrono::Duration,
        resolved_alert_max_age: chrono::Duration,
    ) -> Self {
        Self {
            store,
            metric_max_age,
            critical_metric_max_age,
            resolved_alert_max_age,
        }
    }
}

#[async_trait]
impl CycleTask for RetentionCycle {
    #[instrument(skip(self))]
    async fn run(&self) -> anyhow::Result<()> {
        let now = Utc::now();

        let metrics = self
            .store
            .delete_metrics_older_than(now - self.metric_max_age, &[MetricStatus::Critical])
            .await?;

        let critical = self
            .store
            .delete_metrics_older_than(now - self.critical_metric_max_age, &[])
            .await?;

        let alerts = self
            .store
            .delete_resolved_alerts_older_than(now - self.resolved_alert_max_age)
            .await?;

        debug!(
            "retention sweep deleted {} metrics, {} expired critical metrics, {} resolved alerts",
            metrics, critical, alerts
        );

        Ok(())
    }
}
