//! Stocklens worker runtime.
//!
//! `stocklens-worker [watch]` polls the alert feed until interrupted.
//! `stocklens-worker report <entity-id> [day|week|month|year]` prints the
//! activity summary and trend for one stock as JSON. The tracking API does
//! not expose live shades, so the trend counts UPDATE and ADJUST deltas only;
//! CREATE records add to `activityCount` but not to `stockAdded` or
//! `shadesAdded`.

#![forbid(unsafe_code)]

mod config;

use std::sync::Arc;

use serde::Serialize;
use stocklens_application::{
    AlertInbox, Clock, NotificationStore, PeriodQuery, StockAnalyticsService, SystemClock,
    spawn_alert_polling,
};
use stocklens_core::{AppError, AppResult};
use stocklens_domain::{Granularity, PeriodBucket, StockActivitySummary};
use stocklens_infrastructure::{
    HttpTrackingApi, InMemoryNotificationStore, JsonFileNotificationStore, RedisNotificationStore,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{NotificationStoreBackend, WorkerConfig};

const USAGE: &str = "usage: stocklens-worker [watch | report <entity-id> [day|week|month|year]]";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Watch,
    Report {
        entity_id: String,
        granularity: Granularity,
    },
}

impl Command {
    fn parse(mut args: impl Iterator<Item = String>) -> AppResult<Self> {
        let command = match args.next().as_deref() {
            None | Some("watch") => Self::Watch,
            Some("report") => {
                let entity_id = args
                    .next()
                    .ok_or_else(|| AppError::Validation(USAGE.to_owned()))?;
                let granularity = args
                    .next()
                    .map(|value| value.parse::<Granularity>())
                    .transpose()?
                    .unwrap_or(Granularity::Month);
                Self::Report {
                    entity_id,
                    granularity,
                }
            }
            Some(other) => {
                return Err(AppError::Validation(format!(
                    "unknown command '{other}'; {USAGE}"
                )));
            }
        };

        if args.next().is_some() {
            return Err(AppError::Validation(USAGE.to_owned()));
        }

        Ok(command)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StockReport {
    entity_id: String,
    activity: Option<StockActivitySummary>,
    periods: Vec<PeriodBucket>,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let command = Command::parse(std::env::args().skip(1))?;
    let config = WorkerConfig::load()?;
    let tracking_api = Arc::new(build_tracking_api(&config)?);

    match command {
        Command::Watch => watch_alerts(&config, tracking_api).await,
        Command::Report {
            entity_id,
            granularity,
        } => print_report(tracking_api, entity_id, granularity).await,
    }
}

async fn watch_alerts(config: &WorkerConfig, tracking_api: Arc<HttpTrackingApi>) -> AppResult<()> {
    let store = build_notification_store(&config.store_backend)?;
    let inbox = Arc::new(AlertInbox::initialize(tracking_api, store, Arc::new(SystemClock)).await);

    info!(
        api_base_url = %config.api_base_url,
        poll_interval_seconds = config.poll_interval.as_secs(),
        store_backend = ?config.store_backend,
        restored_notifications = inbox.notifications().len(),
        "stocklens-worker started"
    );

    let polling = spawn_alert_polling(Arc::clone(&inbox), config.poll_interval);
    let signal = tokio::signal::ctrl_c().await.map_err(|error| {
        AppError::Internal(format!("failed to listen for shutdown signal: {error}"))
    });

    polling.shutdown().await;
    info!(
        unread_notifications = inbox.unread_count(),
        "stocklens-worker stopped"
    );

    signal
}

async fn print_report(
    tracking_api: Arc<HttpTrackingApi>,
    entity_id: String,
    granularity: Granularity,
) -> AppResult<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let service = StockAnalyticsService::new(tracking_api, Arc::clone(&clock));

    let activity = service.stock_activity(entity_id.as_str()).await?;
    let anchor = activity
        .as_ref()
        .map_or_else(|| clock.now(), |summary| summary.first_activity);
    let periods = service
        .activity_periods(
            entity_id.as_str(),
            &[],
            PeriodQuery::new(anchor, granularity).only_non_empty(),
        )
        .await?;

    let report = StockReport {
        entity_id,
        activity,
        periods,
    };
    let encoded = serde_json::to_string_pretty(&report)
        .map_err(|error| AppError::Internal(format!("failed to encode report: {error}")))?;
    println!("{encoded}");

    Ok(())
}

fn build_tracking_api(config: &WorkerConfig) -> AppResult<HttpTrackingApi> {
    let http_client = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;

    let tracking_api = HttpTrackingApi::new(http_client, config.api_base_url.clone());
    Ok(match &config.api_token {
        Some(token) => tracking_api.with_bearer_token(token.as_str()),
        None => tracking_api,
    })
}

fn build_notification_store(
    backend: &NotificationStoreBackend,
) -> AppResult<Arc<dyn NotificationStore>> {
    Ok(match backend {
        NotificationStoreBackend::Memory => Arc::new(InMemoryNotificationStore::new()),
        NotificationStoreBackend::File(directory) => {
            Arc::new(JsonFileNotificationStore::new(directory.as_path()))
        }
        NotificationStoreBackend::Redis { url, key_prefix } => {
            let client = redis::Client::open(url.as_str()).map_err(|error| {
                AppError::Validation(format!("invalid REDIS_URL value: {error}"))
            })?;
            Arc::new(RedisNotificationStore::new(client, key_prefix.as_str()))
        }
    })
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
