//! Cycle scheduling
//!
//! Drives the registered probe cycles at independent cadences. Each cycle
//! gets its own timer loop; cycles never block each other. Re-entrancy
//! within one cycle is forbidden: a tick that arrives while the previous
//! invocation is still running is dropped (never queued), guarded by a
//! per-cycle token mutex.
//!
//! ## Failure semantics
//!
//! An error inside a cycle's unit of work is caught at the cycle boundary
//! and logged; it stops neither the scheduler nor any other cycle.
//! `stop()` only prevents new ticks — in-flight work finishes on its own
//! and carries its own timeouts.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// A unit of work the scheduler invokes at each tick.
#[async_trait]
pub trait CycleTask: Send + Sync {
    async fn run(&self) -> anyhow::Result<()>;
}

/// When a cycle fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Fixed interval between runs.
    Every(Duration),

    /// Once a day at the given UTC time.
    Daily { hour: u32, minute: u32 },
}

impl Cadence {
    /// Delay from now until the next tick.
    pub fn next_delay(&self) -> Duration {
        match self {
            Cadence::Every(interval) => *interval,
            Cadence::Daily { hour, minute } => {
                let now = Utc::now();
                let Some(today) = now.date_naive().and_hms_opt(*hour, *minute, 0) else {
                    // out-of-range time, validated away by config; fall back
                    // to a plain daily interval
                    return Duration::from_secs(24 * 60 * 60);
                };
                let target = Utc.from_utc_datetime(&today);
                let next = if target > now {
                    target
                } else {
                    target + chrono::Duration::days(1)
                };

                (next - now).to_std().unwrap_or_default()
            }
        }
    }
}

struct RegisteredCycle {
    name: String,
    cadence: Cadence,
    task: Arc<dyn CycleTask>,
}

/// Drives registered cycles until stopped.
pub struct Scheduler {
    cycles: Vec<RegisteredCycle>,
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            cycles: Vec::new(),
            shutdown_tx,
            handles: Vec::new(),
        }
    }

    /// Register a cycle. Must be called before [`start`](Self::start).
    pub fn register(&mut self, name: impl Into<String>, cadence: Cadence, task: Arc<dyn CycleTask>) {
        self.cycles.push(RegisteredCycle {
            name: name.into(),
            cadence,
            task,
        });
    }

    pub fn cycle_count(&self) -> usize {
        self.cycles.len()
    }

    /// Fire an immediate first run of every cycle, then arm the timers.
    pub fn start(&mut self) {
        if !self.handles.is_empty() {
            warn!("scheduler already started");
            return;
        }

        self.shutdown_tx.send_replace(false);

        for cycle in &self.cycles {
            let shutdown_rx = self.shutdown_tx.subscribe();
            self.handles.push(tokio::spawn(run_cycle_loop(
                cycle.name.clone(),
                cycle.cadence,
                cycle.task.clone(),
                shutdown_rx,
            )));
        }

        debug!("scheduler started with {} cycles", self.cycles.len());
    }

    /// Cancel all timers. In-flight cycle work is allowed to finish.
    pub async fn stop(&mut self) {
        let _ = self.shutdown_tx.send(true);

        for handle in self.handles.drain(..) {
            let _ = handle.await;
        }

        debug!("scheduler stopped");
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_cycle_loop(
    name: String,
    cadence: Cadence,
    task: Arc<dyn CycleTask>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    debug!("starting cycle loop for {name}");

    let in_flight = Arc::new(Mutex::new(()));

    // immediate first run
    spawn_guarded(&name, &task, &in_flight);

    loop {
        let delay = cadence.next_delay();

        tokio::select! {
            _ = tokio::time::sleep(delay) => {
                spawn_guarded(&name, &task, &in_flight);
            }

            _ = shutdown_rx.changed() => break,
        }
    }

    debug!("cycle loop for {name} stopped");
}

/// Run the task in its own task if the cycle is not already in flight.
///
/// The guard token travels into the spawned work, so the cycle loop itself
/// never blocks on the work and a held token means "drop this tick".
fn spawn_guarded(name: &str, task: &Arc<dyn CycleTask>, in_flight: &Arc<Mutex<()>>) {
    match in_flight.clone().try_lock_owned() {
        Ok(guard) => {
            let name = name.to_string();
            let task = task.clone();

            tokio::spawn(async move {
                let _guard = guard;
                if let Err(e) = task.run().await {
                    error!("cycle {name} failed: {e:#}");
                }
            });
        }
        Err(_) => {
            warn!("cycle {name} still running, dropping tick");
        }
    }
}
