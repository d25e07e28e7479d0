//! Alert-level notification rate limiting
//!
//! One map from dedup key (`source:title`) to the last time a dispatch was
//! attempted for that key. The limit applies to the alert, not to individual
//! channels: once a key is stamped, every channel skips it until the window
//! elapses. Stale entries are pruned on each lookup so the map stays bounded
//! by the set of keys seen within one window.
//!
//! The limiter is owned by its `Dispatcher` instance and takes `now`
//! explicitly, so tests can construct isolated instances and drive the clock
//! without sleeping.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tracing::trace;

#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    last_sent: HashMap<String, DateTime<Utc>>,
}

impl RateLimiter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_sent: HashMap::new(),
        }
    }

    /// Whether dispatch for `key` is currently suppressed.
    ///
    /// Prunes expired entries as a side effect.
    pub fn is_limited(&mut self, key: &str, now: DateTime<Utc>) -> bool {
        self.prune(now);
        self.last_sent
            .get(key)
            .map(|sent| now - *sent < self.window)
            .unwrap_or(false)
    }

    /// Stamp `key` with the time of an attempted dispatch.
    pub fn mark_sent(&mut self, key: &str, now: DateTime<Utc>) {
        self.last_sent.insert(key.to_string(), now);
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.last_sent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_sent.is_empty()
    }

    fn prune(&mut self, now: DateTime<Utc>) {
        let window = self.window;
        let before = self.last_sent.len();
        self.last_sent.retain(|_, sent| now - *sent < window);

        let pruned = before - self.last_sent.len();
        if pruned > 0 {
            trace!("pruned {pruned} expired rate-limit entries");
        }
    }
}
