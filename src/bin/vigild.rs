use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

use vigil::ProbeSource;
use vigil::alerts::AlertManager;
use vigil::config::{Config, ProbeTarget, read_config_file};
use vigil::cycles::{ProbeCycle, RetentionCycle};
use vigil::hub::EventHub;
use vigil::notify::channels::{ChatChannel, EmailChannel, WebhookChannel};
use vigil::notify::{ChannelPolicy, Dispatcher};
use vigil::probe::{HealthReport, Probe};
use vigil::scheduler::{Cadence, Scheduler};
use vigil::store::MemoryStore;

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short)]
    file: String,
}

fn init() {
    let filter = filter::Targets::new().with_targets(vec![
        ("vigil", LevelFilter::TRACE),
        ("vigild", LevelFilter::TRACE),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

/// HTTP health probe: GET the endpoint, 2xx within the timeout is healthy.
///
/// This is the daemon's probe collaborator — the core only sees the
/// [`Probe`] trait.
struct HttpProbe {
    source: ProbeSource,
    client: reqwest::Client,
    url: String,
}

impl HttpProbe {
    fn new(target: &ProbeTarget) -> Self {
        Self {
            source: target.source,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(target.timeout_secs))
                .build()
                .expect("Failed to build HTTP client"),
            url: target.url.clone(),
        }
    }
}

#[async_trait::async_trait]
impl Probe for HttpProbe {
    fn source(&self) -> ProbeSource {
        self.source
    }

    async fn check_health(&self) -> HealthReport {
        let start = std::time::Instant::now();

        match self.client.get(&self.url).send().await {
            Ok(response) => {
                let elapsed = start.elapsed().as_millis() as u64;
                let status = response.status();

                let mut report = if status.is_success() {
                    HealthReport::healthy()
                } else {
                    HealthReport::unhealthy(format!("unexpected status {status}"))
                };
                report.response_time_ms = Some(elapsed);
                report.status_code = Some(status.as_u16());
                report
            }
            Err(e) => HealthReport::unhealthy(format!("request failed: {e}")),
        }
    }
}

fn build_dispatcher(config: &Config) -> anyhow::Result<Dispatcher> {
    let window = chrono::Duration::seconds(config.notifications.rate_limit_secs as i64);
    let mut dispatcher = Dispatcher::new(window);

    if let Some(email) = &config.notifications.email {
        let channel = EmailChannel::new(&email.smtp_settings())?;
        dispatcher = dispatcher.register(
            ChannelPolicy::new(email.enabled, email.severities.clone()),
            Arc::new(channel),
        );
    }

    if let Some(chat) = &config.notifications.chat {
        dispatcher = dispatcher.register(
            ChannelPolicy::new(chat.enabled, chat.severities.clone()),
            Arc::new(ChatChannel::new(
                chat.url.clone(),
                chat.mention_user_id.clone(),
            )),
        );
    }

    if let Some(webhook) = &config.notifications.webhook {
        dispatcher = dispatcher.register(
            ChannelPolicy::new(webhook.enabled, webhook.severities.clone()),
            Arc::new(WebhookChannel::new(webhook.url.clone()).with_headers(webhook.headers.clone())),
        );
    }

    Ok(dispatcher)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init();

    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = read_config_file(&args.file)?;

    let store = Arc::new(MemoryStore::new());
    let hub = EventHub::default();
    let dispatcher = Arc::new(build_dispatcher(&config)?);
    let alerts = Arc::new(AlertManager::new(
        store.clone(),
        dispatcher,
        hub.clone(),
        config.dedup_policy(),
    ));

    let probes: Vec<Arc<dyn Probe>> = config
        .probes
        .iter()
        .map(|target| Arc::new(HttpProbe::new(target)) as Arc<dyn Probe>)
        .collect();

    let thresholds = config.threshold_set();

    let mut scheduler = Scheduler::new();
    scheduler.register(
        "health",
        Cadence::Every(Duration::from_secs(config.cycles.health_interval_secs)),
        Arc::new(ProbeCycle::health(
            "health",
            probes.clone(),
            thresholds.clone(),
            store.clone(),
            alerts.clone(),
            hub.clone(),
        )),
    );
    scheduler.register(
        "metrics",
        Cadence::Every(Duration::from_secs(config.cycles.metrics_interval_secs)),
        Arc::new(ProbeCycle::metrics(
            "metrics",
            probes.clone(),
            thresholds.clone(),
            store.clone(),
            alerts.clone(),
            hub.clone(),
        )),
    );
    scheduler.register(
        "retention",
        Cadence::Daily {
            hour: config.cycles.retention_hour_utc,
            minute: 0,
        },
        Arc::new(RetentionCycle::new(
            store.clone(),
            chrono::Duration::days(config.retention.metric_days as i64),
            chrono::Duration::days(config.retention.critical_metric_days as i64),
            chrono::Duration::days(config.retention.resolved_alert_days as i64),
        )),
    );

    scheduler.start();
    info!(
        "vigild running with {} probes across {} cycles",
        probes.len(),
        scheduler.cycle_count()
    );

    tokio::signal::ctrl_c().await?;
    info!("shutting down, letting in-flight cycles finish");
    scheduler.stop().await;

    Ok(())
}
