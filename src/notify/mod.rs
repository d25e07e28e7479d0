//! Notification dispatch
//!
//! The dispatcher fans one alert out to the configured channels. Per
//! channel it checks the enable flag and the severity notify-set; before any
//! channel runs it checks the shared alert-level rate limit. Channel
//! failures are isolated — one transport erroring never prevents delivery
//! attempts on the others — and every channel's outcome is reported
//! individually.
//!
//! Channels are an open set: anything implementing [`NotifyChannel`] can be
//! registered, each owning its transport and message formatting.

pub mod channels;
pub mod ratelimit;

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument};

use crate::{Alert, ChannelKind, Severity};

use ratelimit::RateLimiter;

/// Errors from a single channel transport
#[derive(Debug)]
pub enum ChannelError {
    /// Delivery failed (network error, non-success response, SMTP rejection)
    Transport(String),

    /// The channel is misconfigured (bad address, bad URL)
    Config(String),
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelError::Transport(msg) => write!(f, "channel transport error: {}", msg),
            ChannelError::Config(msg) => write!(f, "channel configuration error: {}", msg),
        }
    }
}

impl std::error::Error for ChannelError {}

/// One notification transport. Implementations own their formatting; the
/// dispatcher only sees success or failure.
#[async_trait]
pub trait NotifyChannel: Send + Sync {
    fn kind(&self) -> ChannelKind;

    async fn send(&self, alert: &Alert) -> Result<(), ChannelError>;
}

/// Per-channel dispatch policy, built from validated configuration.
#[derive(Debug, Clone)]
pub struct ChannelPolicy {
    pub enabled: bool,
    pub severities: HashSet<Severity>,
}

impl ChannelPolicy {
    pub fn new(enabled: bool, severities: impl IntoIterator<Item = Severity>) -> Self {
        Self {
            enabled,
            severities: severities.into_iter().collect(),
        }
    }

    pub fn allows(&self, severity: Severity) -> bool {
        self.severities.contains(&severity)
    }
}

/// What happened on one channel for one dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchStatus {
    Sent,
    Failed(String),
    SkippedDisabled,
    SkippedSeverity,
    RateLimited,
}

impl DispatchStatus {
    /// Whether delivery was actually attempted (attempted, not necessarily
    /// succeeded — failures still count for `notification_channels`).
    pub fn attempted(&self) -> bool {
        matches!(self, DispatchStatus::Sent | DispatchStatus::Failed(_))
    }
}

#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub channel: ChannelKind,
    pub status: DispatchStatus,
}

struct ConfiguredChannel {
    policy: ChannelPolicy,
    transport: Arc<dyn NotifyChannel>,
}

/// Fans alerts out to the registered channels under a shared rate limit.
pub struct Dispatcher {
    channels: Vec<ConfiguredChannel>,
    limiter: Mutex<RateLimiter>,
}

impl Dispatcher {
    pub fn new(rate_limit_window: Duration) -> Self {
        Self {
            channels: Vec::new(),
            limiter: Mutex::new(RateLimiter::new(rate_limit_window)),
        }
    }

    /// Register a channel with its policy.
    pub fn register(mut self, policy: ChannelPolicy, transport: Arc<dyn NotifyChannel>) -> Self {
        self.channels.push(ConfiguredChannel { policy, transport });
        self
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Dispatch one alert to every eligible channel.
    ///
    /// The rate limit is alert-level: if the key was stamped within the
    /// window, no channel is attempted and the stamp is left untouched, so
    /// the window runs from the last *attempted* dispatch. Otherwise every
    /// channel is given its chance and the key is stamped afterwards.
    #[instrument(skip(self, alert), fields(key = %alert.dedup_key(), severity = %alert.severity))]
    pub async fn dispatch(&self, alert: &Alert) -> Vec<DispatchOutcome> {
        let key = alert.dedup_key();

        {
            let mut limiter = self.limiter.lock().await;
            if limiter.is_limited(&key, Utc::now()) {
                debug!("rate limit active, skipping all channels");
                return self
                    .channels
                    .iter()
                    .map(|channel| DispatchOutcome {
                        channel: channel.transport.kind(),
                        status: DispatchStatus::RateLimited,
                    })
                    .collect();
            }
        }

        let mut outcomes = Vec::with_capacity(self.channels.len());

        for channel in &self.channels {
            let kind = channel.transport.kind();

            if !channel.policy.enabled {
                outcomes.push(DispatchOutcome {
                    channel: kind,
                    status: DispatchStatus::SkippedDisabled,
                });
                continue;
            }

            if !channel.policy.allows(alert.severity) {
                debug!("severity not in notify-set for {kind}, skipping");
                outcomes.push(DispatchOutcome {
                    channel: kind,
                    status: DispatchStatus::SkippedSeverity,
                });
                continue;
            }

            match channel.transport.send(alert).await {
                Ok(()) => {
                    info!("delivered alert via {kind}");
                    outcomes.push(DispatchOutcome {
                        channel: kind,
                        status: DispatchStatus::Sent,
                    });
                }
                Err(e) => {
                    error!("delivery via {kind} failed: {e}");
                    outcomes.push(DispatchOutcome {
                        channel: kind,
                        status: DispatchStatus::Failed(e.to_string()),
                    });
                }
            }
        }

        self.limiter.lock().await.mark_sent(&key, Utc::now());

        outcomes
    }

    /// Channels on which delivery was attempted, in registration order.
    pub fn attempted_channels(outcomes: &[DispatchOutcome]) -> Vec<ChannelKind> {
        let mut seen = HashSet::new();
        outcomes
            .iter()
            .filter(|outcome| outcome.status.attempted())
            .map(|outcome| outcome.channel)
            .filter(|kind| seen.insert(*kind))
            .collect()
    }
}
