//! Scheduler driving real probe cycles

use std::sync::Arc;
use std::time::Duration;

use vigil::alerts::DedupPolicy;
use vigil::cycles::ProbeCycle;
use vigil::scheduler::{Cadence, Scheduler};
use vigil::thresholds::ThresholdSet;
use vigil::{MetricStatus, ProbeSource};

use super::helpers::*;

#[tokio::test]
async fn test_scheduler_drives_health_cycle_end_to_end() {
    let world = world(DedupPolicy::default(), chrono::Duration::minutes(15));

    let cycle = Arc::new(ProbeCycle::health(
        "health",
        vec![StaticProbe::healthy(ProbeSource::Site)],
        ThresholdSet::default(),
        world.store.clone(),
        world.alerts.clone(),
        world.hub.clone(),
    ));

    let mut scheduler = Scheduler::new();
    scheduler.register("health", Cadence::Every(Duration::from_millis(60)), cycle);

    scheduler.start();
    tokio::time::sleep(Duration::from_millis(220)).await;
    scheduler.stop().await;

    // Immediate run plus ticks, each writing the availability reading
    let metrics = world.store.metrics().await;
    assert!(metrics.len() >= 3, "expected >= 3 metrics, got {}", metrics.len());
    assert!(metrics.iter().all(|m| m.name == "up"));
    assert!(metrics.iter().all(|m| m.status == MetricStatus::Normal));
}

#[tokio::test]
async fn test_independent_cadences_run_concurrently() {
    let world = world(DedupPolicy::default(), chrono::Duration::minutes(15));

    let health = Arc::new(ProbeCycle::health(
        "health",
        vec![StaticProbe::healthy(ProbeSource::Site)],
        ThresholdSet::default(),
        world.store.clone(),
        world.alerts.clone(),
        world.hub.clone(),
    ));
    let metrics = Arc::new(ProbeCycle::metrics(
        "metrics",
        vec![StaticProbe::with_reading(ProbeSource::Node, "cpu_usage", 42.0)],
        cpu_thresholds(),
        world.store.clone(),
        world.alerts.clone(),
        world.hub.clone(),
    ));

    let mut scheduler = Scheduler::new();
    scheduler.register("health", Cadence::Every(Duration::from_millis(50)), health);
    scheduler.register("metrics", Cadence::Every(Duration::from_millis(120)), metrics);

    scheduler.start();
    tokio::time::sleep(Duration::from_millis(260)).await;
    scheduler.stop().await;

    let stored = world.store.metrics().await;
    let health_count = stored.iter().filter(|m| m.name == "up").count();
    let metric_count = stored.iter().filter(|m| m.name == "cpu_usage").count();

    // The faster cadence ran more often than the slower one; both ran
    assert!(health_count >= 3, "health ran {health_count} times");
    assert!(metric_count >= 2, "metrics ran {metric_count} times");
    assert!(health_count > metric_count);
}

#[tokio::test]
async fn test_stopped_scheduler_produces_nothing_further() {
    let world = world(DedupPolicy::default(), chrono::Duration::minutes(15));

    let cycle = Arc::new(ProbeCycle::health(
        "health",
        vec![StaticProbe::healthy(ProbeSource::Site)],
        ThresholdSet::default(),
        world.store.clone(),
        world.alerts.clone(),
        world.hub.clone(),
    ));

    let mut scheduler = Scheduler::new();
    scheduler.register("health", Cadence::Every(Duration::from_millis(50)), cycle);

    scheduler.start();
    tokio::time::sleep(Duration::from_millis(120)).await;
    scheduler.stop().await;
    // brief grace so any already-spawned work lands before sampling
    tokio::time::sleep(Duration::from_millis(50)).await;

    let count_at_stop = world.store.metric_count().await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(world.store.metric_count().await, count_at_stop);
}
