use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use stocklens_core::{AppError, AppResult};
use stocklens_domain::{AuditAction, AuditRecord, Granularity, Shade};

use crate::clock::Clock;
use crate::tracking_ports::{AuditTrailSource, TrackingQuery};

use super::{DEFAULT_RECORD_LIMIT, MAX_RECORD_LIMIT, PeriodQuery, StockAnalyticsService};

struct FixedClock(DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[derive(Default)]
struct FakeAuditTrail {
    records: Vec<AuditRecord>,
    queries: Mutex<Vec<TrackingQuery>>,
    unavailable: bool,
}

impl FakeAuditTrail {
    fn with_records(records: Vec<AuditRecord>) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }

    fn recorded_limits(&self) -> Vec<u32> {
        self.queries
            .lock()
            .map(|queries| queries.iter().map(|query| query.limit).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AuditTrailSource for FakeAuditTrail {
    async fn list_tracking_records(&self, query: TrackingQuery) -> AppResult<Vec<AuditRecord>> {
        if self.unavailable {
            return Err(AppError::Internal("tracking api unavailable".to_owned()));
        }

        let entity_id = query.entity_id.as_str().to_owned();
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query);
        }

        Ok(self
            .records
            .iter()
            .filter(|record| record.entity_id == entity_id)
            .cloned()
            .collect())
    }
}

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, day, hour, 0, 0)
        .single()
        .unwrap_or_else(|| unreachable!())
}

fn shades() -> Vec<Shade> {
    vec![
        Shade::new("shade-red", "#ff0000", 117),
        Shade::new("shade-green", "#00ff00", 8),
    ]
}

fn trail() -> Vec<AuditRecord> {
    vec![
        AuditRecord::new(
            "r1",
            "stock-1",
            AuditAction::Update,
            "#ff0000: quantity: 137 → 117 (-20)",
            at(17, 10),
        ),
        AuditRecord::new(
            "r2",
            "stock-1",
            AuditAction::Adjust,
            "Stock INCREMENT: ST-1 | 5 units | From: 10 → To: 15",
            at(18, 9),
        ),
        AuditRecord::new(
            "r3",
            "stock-1",
            AuditAction::Update,
            "#00ff00: quantity: 4 → 10 (+6)",
            at(15, 8),
        ),
        AuditRecord::new(
            "r4",
            "stock-1",
            AuditAction::Update,
            "#00ff00: quantity: 10 → 8 (-2)",
            at(16, 8),
        ),
        AuditRecord::new(
            "other",
            "stock-2",
            AuditAction::Update,
            "#ff0000: quantity: 1 → 50 (+49)",
            at(16, 8),
        ),
    ]
}

fn service(audit_trail: Arc<FakeAuditTrail>) -> StockAnalyticsService {
    StockAnalyticsService::new(audit_trail, Arc::new(FixedClock(at(18, 15))))
}

#[tokio::test]
async fn shade_analytics_follow_shade_order() {
    let service = service(Arc::new(FakeAuditTrail::with_records(trail())));

    let analytics = service.shade_analytics("stock-1", &shades()).await;
    assert!(analytics.is_ok());
    let analytics = analytics.unwrap_or_else(|_| unreachable!());

    assert_eq!(analytics.len(), 2);
    assert_eq!(analytics[0].shade_id, "shade-red");
    assert_eq!(analytics[0].total_reductions, 20);
    assert_eq!(analytics[1].shade_id, "shade-green");
    assert_eq!(analytics[1].total_changes, 2);
    assert_eq!(analytics[1].net_change, 4);
    assert_eq!(analytics[1].last_updated, Some(at(16, 8)));
}

#[tokio::test]
async fn shade_ranking_puts_most_active_first() {
    let service = service(Arc::new(FakeAuditTrail::with_records(trail())));

    let ranking = service.shade_ranking("stock-1", &shades()).await;
    assert!(ranking.is_ok());
    let ranking = ranking.unwrap_or_else(|_| unreachable!());

    let ids: Vec<&str> = ranking.iter().map(|item| item.shade_id.as_str()).collect();
    assert_eq!(ids, vec!["shade-green", "shade-red"]);
}

#[tokio::test]
async fn stock_activity_sums_color_changes_and_adjustments() {
    let service = service(Arc::new(FakeAuditTrail::with_records(trail())));

    let summary = service.stock_activity("stock-1").await;
    assert!(summary.is_ok());
    let summary = summary.unwrap_or_else(|_| unreachable!());
    assert!(summary.is_some());
    let summary = summary.unwrap_or_else(|| unreachable!());

    assert_eq!(summary.units_added, 11);
    assert_eq!(summary.units_reduced, 22);
    assert_eq!(summary.net_change, -11);
    assert_eq!(summary.record_count, 4);
    assert_eq!(summary.first_activity, at(15, 8));
    assert_eq!(summary.last_activity, at(18, 9));
}

#[tokio::test]
async fn stock_activity_is_none_without_records() {
    let service = service(Arc::new(FakeAuditTrail::default()));

    let summary = service.stock_activity("stock-1").await;

    assert!(matches!(summary, Ok(None)));
}

#[tokio::test]
async fn activity_periods_fill_daily_buckets() {
    let service = service(Arc::new(FakeAuditTrail::with_records(trail())));
    let query = PeriodQuery::new(at(1, 0), Granularity::Day);

    let buckets = service.activity_periods("stock-1", &shades(), query).await;
    assert!(buckets.is_ok());
    let buckets = buckets.unwrap_or_else(|_| unreachable!());

    assert_eq!(buckets.len(), 7);
    let today = &buckets[6];
    assert_eq!(today.label, "Oct 18");
    assert_eq!(today.stock_added, 5);
    assert_eq!(today.shades_added, 0);
    assert_eq!(today.activity_count, 1);
    let yesterday = &buckets[5];
    assert_eq!(yesterday.stock_reduced, 20);
    assert_eq!(yesterday.shades_removed, 1);
}

#[tokio::test]
async fn activity_periods_can_drop_empty_buckets() {
    let service = service(Arc::new(FakeAuditTrail::with_records(trail())));
    let query = PeriodQuery::new(at(1, 0), Granularity::Day).only_non_empty();

    let buckets = service.activity_periods("stock-1", &shades(), query).await;
    assert!(buckets.is_ok());
    let labels: Vec<String> = buckets
        .unwrap_or_else(|_| unreachable!())
        .into_iter()
        .map(|bucket| bucket.label)
        .collect();

    assert_eq!(labels, vec!["Oct 15", "Oct 16", "Oct 17", "Oct 18"]);
}

#[tokio::test]
async fn blank_entity_id_is_rejected_before_fetching() {
    let audit_trail = Arc::new(FakeAuditTrail::with_records(trail()));
    let service = service(Arc::clone(&audit_trail));

    let result = service.shade_analytics("  ", &shades()).await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert!(audit_trail.recorded_limits().is_empty());
}

#[tokio::test]
async fn fetch_errors_propagate() {
    let service = service(Arc::new(FakeAuditTrail {
        unavailable: true,
        ..FakeAuditTrail::default()
    }));

    let result = service.stock_activity("stock-1").await;

    assert!(matches!(result, Err(AppError::Internal(_))));
}

#[tokio::test]
async fn record_limit_is_clamped_and_forwarded() {
    let audit_trail = Arc::new(FakeAuditTrail::with_records(trail()));

    let default_service = service(Arc::clone(&audit_trail));
    assert_eq!(default_service.record_limit(), DEFAULT_RECORD_LIMIT);
    let _ = default_service.stock_activity("stock-1").await;

    let capped = service(Arc::clone(&audit_trail)).with_record_limit(5_000);
    assert_eq!(capped.record_limit(), MAX_RECORD_LIMIT);
    let _ = capped.stock_activity("stock-1").await;

    let floored = service(Arc::clone(&audit_trail)).with_record_limit(0);
    assert_eq!(floored.record_limit(), 1);

    assert_eq!(
        audit_trail.recorded_limits(),
        vec![DEFAULT_RECORD_LIMIT, MAX_RECORD_LIMIT]
    );
}
