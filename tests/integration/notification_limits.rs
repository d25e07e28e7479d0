//! Rate limiting and severity filtering across the dispatch path

use std::sync::Arc;

use chrono::Duration;
use pretty_assertions::assert_eq;

use vigil::alerts::{AlertCandidate, DedupPolicy};
use vigil::notify::{ChannelPolicy, Dispatcher};
use vigil::{ChannelKind, ProbeSource, Severity};

use super::helpers::*;

fn three_channel_world(rate_limit: Duration, dedup: DedupPolicy) -> (
    super::helpers::World,
    Arc<CountingChannel>,
    Arc<CountingChannel>,
) {
    // world() wires one webhook channel; add email + chat beside it
    let email = CountingChannel::new(ChannelKind::Email);
    let chat = CountingChannel::new(ChannelKind::Chat);

    let store = Arc::new(vigil::store::MemoryStore::new());
    let webhook = CountingChannel::new(ChannelKind::Webhook);
    let dispatcher = Arc::new(
        Dispatcher::new(rate_limit)
            .register(ChannelPolicy::new(true, all_severities()), email.clone())
            .register(ChannelPolicy::new(true, all_severities()), chat.clone())
            .register(ChannelPolicy::new(true, all_severities()), webhook.clone()),
    );
    let hub = vigil::hub::EventHub::default();
    let alerts = Arc::new(vigil::alerts::AlertManager::new(
        store.clone(),
        dispatcher,
        hub.clone(),
        dedup,
    ));

    (
        super::helpers::World {
            store,
            hub,
            alerts,
            channel: webhook,
        },
        email,
        chat,
    )
}

fn down_candidate() -> AlertCandidate {
    AlertCandidate::new(
        "Site Down",
        "connection refused",
        Severity::Critical,
        ProbeSource::Site,
    )
}

#[tokio::test]
async fn test_same_key_within_window_attempts_zero_sends() {
    // Dedup disabled so two real alert records are created; only the rate
    // limiter stands between them and the channels
    let (world, email, chat) =
        three_channel_world(Duration::minutes(15), DedupPolicy::new(Duration::zero()));

    let first = world.alerts.raise(down_candidate()).await.unwrap();
    let second = world.alerts.raise(down_candidate()).await.unwrap();

    assert_eq!(world.store.alert_count().await, 2);

    // All three channels fired once, for the first alert only
    assert_eq!(email.calls(), 1);
    assert_eq!(chat.calls(), 1);
    assert_eq!(world.channel.calls(), 1);

    assert_eq!(first.alert().notification_channels.len(), 3);
    assert!(second.alert().notification_channels.is_empty());
}

#[tokio::test]
async fn test_same_key_after_window_attempts_all_channels_again() {
    let (world, email, chat) = three_channel_world(
        Duration::milliseconds(50),
        DedupPolicy::new(Duration::zero()),
    );

    world.alerts.raise(down_candidate()).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(80)).await;
    let second = world.alerts.raise(down_candidate()).await.unwrap();

    assert_eq!(email.calls(), 2);
    assert_eq!(chat.calls(), 2);
    assert_eq!(world.channel.calls(), 2);
    assert_eq!(second.alert().notification_channels.len(), 3);
}

#[tokio::test]
async fn test_distinct_keys_are_limited_independently() {
    let (world, email, _chat) =
        three_channel_world(Duration::minutes(15), DedupPolicy::new(Duration::zero()));

    world.alerts.raise(down_candidate()).await.unwrap();

    let other = AlertCandidate::new(
        "Storefront Down",
        "bad gateway",
        Severity::Critical,
        ProbeSource::Storefront,
    );
    world.alerts.raise(other).await.unwrap();

    assert_eq!(email.calls(), 2);
}

#[tokio::test]
async fn test_per_channel_severity_filters() {
    let email = CountingChannel::new(ChannelKind::Email);
    let chat = CountingChannel::new(ChannelKind::Chat);

    let store = Arc::new(vigil::store::MemoryStore::new());
    let dispatcher = Arc::new(
        Dispatcher::new(Duration::zero())
            // email only wants the house on fire
            .register(ChannelPolicy::new(true, [Severity::Critical]), email.clone())
            // chat hears everything above info
            .register(
                ChannelPolicy::new(
                    true,
                    [Severity::Warning, Severity::Error, Severity::Critical],
                ),
                chat.clone(),
            ),
    );
    let alerts = vigil::alerts::AlertManager::new(
        store,
        dispatcher,
        vigil::hub::EventHub::default(),
        DedupPolicy::new(Duration::zero()),
    );

    let warning = AlertCandidate::new(
        "Slow Responses",
        "response_time_ms at 2500.0",
        Severity::Warning,
        ProbeSource::Site,
    );
    let outcome = alerts.raise(warning).await.unwrap();

    assert_eq!(email.calls(), 0);
    assert_eq!(chat.calls(), 1);
    assert_eq!(
        outcome.alert().notification_channels,
        vec![ChannelKind::Chat]
    );

    let critical = AlertCandidate::new(
        "Site Down",
        "connection refused",
        Severity::Critical,
        ProbeSource::Site,
    );
    let outcome = alerts.raise(critical).await.unwrap();

    assert_eq!(email.calls(), 1);
    assert_eq!(chat.calls(), 2);
    assert_eq!(
        outcome.alert().notification_channels,
        vec![ChannelKind::Email, ChannelKind::Chat]
    );
}

#[tokio::test]
async fn test_disabled_channel_never_fires_but_others_do() {
    let email = CountingChannel::new(ChannelKind::Email);
    let webhook = CountingChannel::new(ChannelKind::Webhook);

    let dispatcher = Dispatcher::new(Duration::minutes(15))
        .register(ChannelPolicy::new(false, all_severities()), email.clone())
        .register(ChannelPolicy::new(true, all_severities()), webhook.clone());

    let alert = {
        let world = world(DedupPolicy::default(), Duration::minutes(15));
        world
            .alerts
            .raise(down_candidate())
            .await
            .unwrap()
            .alert()
            .clone()
    };

    let outcomes = dispatcher.dispatch(&alert).await;

    assert_eq!(email.calls(), 0);
    assert_eq!(webhook.calls(), 1);
    assert_eq!(
        Dispatcher::attempted_channels(&outcomes),
        vec![ChannelKind::Webhook]
    );
}
