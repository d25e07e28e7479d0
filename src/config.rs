use std::collections::HashMap;

use anyhow::bail;
use tracing::trace;

use crate::alerts::DedupPolicy;
use crate::notify::channels::email::SmtpSettings;
use crate::thresholds::{Direction, ThresholdSet, ThresholdSpec};
use crate::{ProbeSource, Severity};

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct Config {
    /// Endpoints the daemon's HTTP probes watch.
    #[serde(default)]
    pub probes: Vec<ProbeTarget>,

    #[serde(default)]
    pub cycles: CyclesConfig,

    /// Threshold pairs keyed by metric name.
    #[serde(default)]
    pub thresholds: HashMap<String, ThresholdSpec>,

    #[serde(default)]
    pub dedup: DedupConfig,

    #[serde(default)]
    pub notifications: NotifyConfig,

    #[serde(default)]
    pub retention: RetentionConfig,
}

/// One endpoint for the daemon's probe collaborators.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ProbeTarget {
    pub source: ProbeSource,
    pub url: String,
    #[serde(default = "default_probe_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct CyclesConfig {
    /// Health check cadence (default: every 5 minutes)
    #[serde(default = "default_health_interval")]
    pub health_interval_secs: u64,

    /// Deep metrics cadence (default: every 15 minutes)
    #[serde(default = "default_metrics_interval")]
    pub metrics_interval_secs: u64,

    /// Daily retention sweep time (UTC hour)
    #[serde(default = "default_retention_hour")]
    pub retention_hour_utc: u32,
}

impl Default for CyclesConfig {
    fn default() -> Self {
        Self {
            health_interval_secs: default_health_interval(),
            metrics_interval_secs: default_metrics_interval(),
            retention_hour_utc: default_retention_hour(),
        }
    }
}

/// Centralized dedup windows (see [`DedupPolicy`]).
#[derive(Debug, Clone, serde::Deserialize)]
pub struct DedupConfig {
    #[serde(default = "default_dedup_window")]
    pub default_window_secs: u64,

    /// Per-category overrides, e.g. `"certificate": 86400` for slow-changing
    /// checks.
    #[serde(default)]
    pub categories: HashMap<String, u64>,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            default_window_secs: default_dedup_window(),
            categories: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct NotifyConfig {
    /// Alert-level rate limit window (default: 15 minutes)
    #[serde(default = "default_rate_limit")]
    pub rate_limit_secs: u64,

    pub email: Option<EmailSettings>,
    pub chat: Option<ChatSettings>,
    pub webhook: Option<WebhookSettings>,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            rate_limit_secs: default_rate_limit(),
            email: None,
            chat: None,
            webhook: None,
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ChatSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_severities")]
    pub severities: Vec<Severity>,
    pub url: String,
    pub mention_user_id: Option<String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct WebhookSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_severities")]
    pub severities: Vec<Severity>,
    pub url: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct EmailSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_severities")]
    pub severities: Vec<Severity>,
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
    pub to: Vec<String>,
}

impl EmailSettings {
    pub fn smtp_settings(&self) -> SmtpSettings {
        SmtpSettings {
            host: self.smtp_host.clone(),
            port: self.smtp_port,
            username: self.username.clone(),
            password: self.password.clone(),
            from: self.from.clone(),
            to: self.to.clone(),
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct RetentionConfig {
    /// Metrics older than this are swept (default: 30 days)
    #[serde(default = "default_metric_days")]
    pub metric_days: u32,

    /// Critical metrics are preserved longer (default: 90 days)
    #[serde(default = "default_critical_metric_days")]
    pub critical_metric_days: u32,

    /// Resolved alerts older than this are swept (default: 30 days)
    #[serde(default = "default_resolved_alert_days")]
    pub resolved_alert_days: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            metric_days: default_metric_days(),
            critical_metric_days: default_critical_metric_days(),
            resolved_alert_days: default_resolved_alert_days(),
        }
    }
}

impl Config {
    pub fn threshold_set(&self) -> ThresholdSet {
        ThresholdSet::new(self.thresholds.clone())
    }

    pub fn dedup_policy(&self) -> DedupPolicy {
        let mut policy =
            DedupPolicy::new(chrono::Duration::seconds(self.dedup.default_window_secs as i64));
        for (category, secs) in &self.dedup.categories {
            policy = policy.with_category(category.clone(), chrono::Duration::seconds(*secs as i64));
        }
        policy
    }

    /// Validate once at startup so misconfiguration fails before the first
    /// cycle fires.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, spec) in &self.thresholds {
            match spec.direction {
                Direction::Above if spec.warning >= spec.critical => {
                    bail!("threshold '{name}': warning must be below critical");
                }
                Direction::Below if spec.warning <= spec.critical => {
                    bail!("threshold '{name}': warning must be above critical for inverted metrics");
                }
                _ => {}
            }
        }

        if self.cycles.health_interval_secs == 0 || self.cycles.metrics_interval_secs == 0 {
            bail!("cycle intervals must be non-zero");
        }

        if self.cycles.retention_hour_utc >= 24 {
            bail!(
                "retention_hour_utc must be 0-23, got {}",
                self.cycles.retention_hour_utc
            );
        }

        if self.retention.critical_metric_days < self.retention.metric_days {
            bail!("critical metrics must be retained at least as long as normal metrics");
        }

        if let Some(chat) = &self.notifications.chat
            && chat.url.is_empty()
        {
            bail!("chat channel needs a webhook url");
        }

        if let Some(webhook) = &self.notifications.webhook
            && webhook.url.is_empty()
        {
            bail!("webhook channel needs a url");
        }

        if let Some(email) = &self.notifications.email
            && email.to.is_empty()
        {
            bail!("email channel needs at least one recipient");
        }

        Ok(())
    }
}

fn default_probe_timeout() -> u64 {
    10
}

fn default_health_interval() -> u64 {
    300
}

fn default_metrics_interval() -> u64 {
    900
}

fn default_retention_hour() -> u32 {
    4
}

fn default_dedup_window() -> u64 {
    3600
}

fn default_rate_limit() -> u64 {
    900
}

fn default_enabled() -> bool {
    true
}

fn default_severities() -> Vec<Severity> {
    vec![Severity::Warning, Severity::Error, Severity::Critical]
}

fn default_smtp_port() -> u16 {
    587
}

fn default_metric_days() -> u32 {
    30
}

fn default_critical_metric_days() -> u32 {
    90
}

fn default_resolved_alert_days() -> u32 {
    30
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&file_content)
        .map_err(|_| anyhow::anyhow!("Invalid configuration file provided!"))?;

    config.validate()?;
    trace!("loaded config: {config:?}");

    Ok(config)
}
