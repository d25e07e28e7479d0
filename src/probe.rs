//! Probe collaborator interface
//!
//! A probe is an opaque collaborator owned by the caller: it knows how to
//! check one monitored source and hand back a structured report. Probes must
//! never panic or error past this boundary — a failed check is a report with
//! `healthy = false` and an error description, and the cycle additionally
//! converts timeouts into the same shape.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::ProbeSource;

/// Health snapshot returned by [`Probe::check_health`].
#[derive(Debug, Clone)]
pub struct HealthReport {
    pub healthy: bool,
    pub response_time_ms: Option<u64>,
    pub status_code: Option<u16>,
    pub error: Option<String>,
    /// Source-specific numeric readings (e.g. `cpu_usage`, `queue_depth`),
    /// evaluated against the configured thresholds by the cycle.
    pub readings: HashMap<String, f64>,
    pub timestamp: DateTime<Utc>,
}

impl HealthReport {
    pub fn healthy() -> Self {
        Self {
            healthy: true,
            response_time_ms: None,
            status_code: None,
            error: None,
            readings: HashMap::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn unhealthy(error: impl Into<String>) -> Self {
        Self {
            healthy: false,
            response_time_ms: None,
            status_code: None,
            error: Some(error.into()),
            readings: HashMap::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_reading(mut self, name: impl Into<String>, value: f64) -> Self {
        self.readings.insert(name.into(), value);
        self
    }
}

/// One aggregated deep-metric reading returned by [`Probe::metrics`].
#[derive(Debug, Clone)]
pub struct MetricReading {
    pub name: String,
    pub current: f64,
    pub average: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub unit: Option<String>,
}

impl MetricReading {
    pub fn new(name: impl Into<String>, current: f64) -> Self {
        Self {
            name: name.into(),
            current,
            average: None,
            min: None,
            max: None,
            unit: None,
        }
    }
}

/// External collaborator yielding health snapshots and metric sets for one
/// monitored source.
#[async_trait]
pub trait Probe: Send + Sync {
    /// The source this probe reports for.
    fn source(&self) -> ProbeSource;

    /// Check the source once. Failures come back as an unhealthy report.
    async fn check_health(&self) -> HealthReport;

    /// Deep metric readings for this source. Sources without deep metrics
    /// return an empty set.
    async fn metrics(&self) -> Vec<MetricReading> {
        Vec::new()
    }
}
