//! Failure isolation scenarios
//!
//! Failing probes, failing stores, and failing channels must each stay
//! contained at their boundary: the cycle completes, the other components
//! keep producing, and the completion event is always published.

use std::sync::Arc;

use chrono::Duration;
use pretty_assertions::assert_eq;

use vigil::alerts::{AlertCandidate, AlertManager, DedupPolicy};
use vigil::cycles::ProbeCycle;
use vigil::hub::{EventHub, MonitorEvent};
use vigil::notify::{ChannelPolicy, Dispatcher};
use vigil::probe::Probe;
use vigil::scheduler::CycleTask;
use vigil::store::MemoryStore;
use vigil::thresholds::ThresholdSet;
use vigil::{ChannelKind, MetricStatus, ProbeSource, Severity};

use super::helpers::*;

#[tokio::test]
async fn test_partial_probe_failure_still_produces_for_survivors() {
    let world = world(DedupPolicy::default(), Duration::minutes(15));
    let mut events = world.hub.subscribe();

    // 2 of 4 configured probes fail
    let probes: Vec<Arc<dyn Probe>> = vec![
        StaticProbe::healthy(ProbeSource::Site),
        StaticProbe::failing(ProbeSource::Storefront, "connection refused"),
        StaticProbe::healthy(ProbeSource::Node),
        StaticProbe::failing(ProbeSource::Analytics, "dns error"),
    ];

    let cycle = ProbeCycle::health(
        "health",
        probes,
        ThresholdSet::default(),
        world.store.clone(),
        world.alerts.clone(),
        world.hub.clone(),
    );

    cycle.run().await.unwrap();

    // Every probe contributed an availability metric, failures included
    let metrics = world.store.metrics().await;
    assert_eq!(metrics.len(), 4);
    assert_eq!(
        metrics
            .iter()
            .filter(|m| m.status == MetricStatus::Normal)
            .count(),
        2
    );
    assert_eq!(
        metrics
            .iter()
            .filter(|m| m.status == MetricStatus::Critical)
            .count(),
        2
    );

    // Both failing sources raised alerts
    let mut titles: Vec<_> = world
        .store
        .alerts()
        .await
        .into_iter()
        .map(|a| a.title)
        .collect();
    titles.sort();
    assert_eq!(titles, vec!["Analytics Down", "Storefront Down"]);

    // The completion marker still went out
    let mut saw_completion = false;
    while let Ok(event) = events.try_recv() {
        if matches!(event, MonitorEvent::CycleComplete { ref cycle } if cycle == "health") {
            saw_completion = true;
        }
    }
    assert!(saw_completion);
}

#[tokio::test]
async fn test_store_failure_does_not_stop_the_cycle() {
    let inner = Arc::new(MemoryStore::new());
    let broken = Arc::new(BrokenMetricStore::new(inner.clone()));
    let channel = CountingChannel::new(ChannelKind::Webhook);
    let dispatcher = Arc::new(
        Dispatcher::new(Duration::minutes(15))
            .register(ChannelPolicy::new(true, all_severities()), channel.clone()),
    );
    let hub = EventHub::default();
    let mut events = hub.subscribe();
    let alerts = Arc::new(AlertManager::new(
        broken.clone(),
        dispatcher,
        hub.clone(),
        DedupPolicy::default(),
    ));

    let cycle = ProbeCycle::health(
        "health",
        vec![StaticProbe::failing(ProbeSource::Site, "timeout")],
        ThresholdSet::default(),
        broken,
        alerts,
        hub.clone(),
    );

    // Metric writes fail; the cycle must still finish and raise the alert
    cycle.run().await.unwrap();

    assert_eq!(inner.metric_count().await, 0);
    assert_eq!(inner.alert_count().await, 1);
    assert_eq!(channel.calls(), 1);

    let mut saw_completion = false;
    while let Ok(event) = events.try_recv() {
        if matches!(event, MonitorEvent::CycleComplete { .. }) {
            saw_completion = true;
        }
    }
    assert!(saw_completion);
}

#[tokio::test]
async fn test_failing_channel_still_counts_as_attempted() {
    let store = Arc::new(MemoryStore::new());
    let failing = CountingChannel::failing(ChannelKind::Chat);
    let ok = CountingChannel::new(ChannelKind::Webhook);

    let dispatcher = Arc::new(
        Dispatcher::new(Duration::minutes(15))
            .register(ChannelPolicy::new(true, all_severities()), failing.clone())
            .register(ChannelPolicy::new(true, all_severities()), ok.clone()),
    );
    let alerts = AlertManager::new(
        store.clone(),
        dispatcher,
        EventHub::default(),
        DedupPolicy::default(),
    );

    let outcome = alerts
        .raise(AlertCandidate::new(
            "Site Down",
            "timeout",
            Severity::Critical,
            ProbeSource::Site,
        ))
        .await
        .unwrap();

    // One channel failed, the other delivered; both were attempted and the
    // record reflects that
    assert_eq!(failing.calls(), 1);
    assert_eq!(ok.calls(), 1);
    assert!(outcome.alert().notification_sent);
    assert_eq!(
        outcome.alert().notification_channels,
        vec![ChannelKind::Chat, ChannelKind::Webhook]
    );
}

#[tokio::test]
async fn test_unhealthy_probe_dedup_across_cycles() {
    let world = world(DedupPolicy::default(), Duration::minutes(15));

    let cycle = ProbeCycle::health(
        "health",
        vec![StaticProbe::failing(ProbeSource::Site, "connection refused")],
        ThresholdSet::default(),
        world.store.clone(),
        world.alerts.clone(),
        world.hub.clone(),
    );

    // The source stays down across three cycles; one alert, one notification
    for _ in 0..3 {
        cycle.run().await.unwrap();
    }

    assert_eq!(world.store.alert_count().await, 1);
    assert_eq!(world.channel.calls(), 1);

    // Each cycle still recorded the availability reading
    assert_eq!(world.store.metric_count().await, 3);
}
