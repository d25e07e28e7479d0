//! Threshold evaluation
//!
//! Maps a raw metric value against a configured (warning, critical) pair.
//! Evaluation is pure: the same value and spec always yield the same status,
//! and nothing here touches clocks, stores, or channels.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::MetricStatus;

/// Comparison direction for a threshold pair.
///
/// Most metrics breach upwards (CPU usage, response time). Some are inverted
/// and breach downwards (uptime percentage, cache hit rate): for those the
/// critical boundary is the lower one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Above,
    Below,
}

/// Threshold pair for one metric name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSpec {
    pub warning: f64,
    pub critical: f64,
    #[serde(default)]
    pub direction: Direction,
    /// Alert title used when this threshold is breached, e.g. "High CPU Usage".
    pub title: Option<String>,
    pub category: Option<String>,
    pub unit: Option<String>,
}

impl ThresholdSpec {
    pub fn new(warning: f64, critical: f64) -> Self {
        Self {
            warning,
            critical,
            direction: Direction::Above,
            title: None,
            category: None,
            unit: None,
        }
    }

    pub fn inverted(warning: f64, critical: f64) -> Self {
        Self {
            direction: Direction::Below,
            ..Self::new(warning, critical)
        }
    }

    /// Evaluate a value against this pair.
    ///
    /// `Above`: value >= critical → critical, else value >= warning → warning.
    /// `Below` mirrors the comparisons.
    pub fn evaluate(&self, value: f64) -> MetricStatus {
        match self.direction {
            Direction::Above => {
                if value >= self.critical {
                    MetricStatus::Critical
                } else if value >= self.warning {
                    MetricStatus::Warning
                } else {
                    MetricStatus::Normal
                }
            }
            Direction::Below => {
                if value <= self.critical {
                    MetricStatus::Critical
                } else if value <= self.warning {
                    MetricStatus::Warning
                } else {
                    MetricStatus::Normal
                }
            }
        }
    }

    /// The boundary that was crossed for a given status, for alert records.
    pub fn boundary_for(&self, status: MetricStatus) -> Option<f64> {
        match status {
            MetricStatus::Normal => None,
            MetricStatus::Warning => Some(self.warning),
            MetricStatus::Critical => Some(self.critical),
        }
    }
}

/// Threshold pairs keyed by metric name.
#[derive(Debug, Clone, Default)]
pub struct ThresholdSet {
    specs: HashMap<String, ThresholdSpec>,
}

impl ThresholdSet {
    pub fn new(specs: HashMap<String, ThresholdSpec>) -> Self {
        Self { specs }
    }

    pub fn spec(&self, metric_name: &str) -> Option<&ThresholdSpec> {
        self.specs.get(metric_name)
    }

    /// Evaluate a named metric. Names without a configured pair are `Normal`.
    pub fn evaluate(&self, metric_name: &str, value: f64) -> MetricStatus {
        self.specs
            .get(metric_name)
            .map(|spec| spec.evaluate(value))
            .unwrap_or(MetricStatus::Normal)
    }
}
