use std::sync::Arc;

use chrono::{DateTime, Utc};
use stocklens_core::{AppResult, NonEmptyString};
use stocklens_domain::{
    AuditRecord, Granularity, PeriodBucket, PeriodOptions, Shade, ShadeAnalytics,
    StockActivitySummary, assign, build_periods, compute_shade_analytics, compute_stock_activity,
    non_empty, rank_by_total_changes,
};
use tracing::debug;

use crate::clock::Clock;
use crate::tracking_ports::{AuditTrailSource, TrackingQuery};

/// Number of audit records requested when no limit is configured.
pub const DEFAULT_RECORD_LIMIT: u32 = 500;
/// Largest accepted audit record limit.
pub const MAX_RECORD_LIMIT: u32 = 1000;

/// Trend report request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodQuery {
    /// Creation time of the stock; anchors month and year buckets.
    pub anchor: DateTime<Utc>,
    /// Bucket size.
    pub granularity: Granularity,
    /// Calendar options.
    pub options: PeriodOptions,
    /// Drops buckets without activity when set.
    pub only_non_empty: bool,
}

impl PeriodQuery {
    /// Creates a query including empty buckets with default calendar options.
    #[must_use]
    pub fn new(anchor: DateTime<Utc>, granularity: Granularity) -> Self {
        Self {
            anchor,
            granularity,
            options: PeriodOptions::default(),
            only_non_empty: false,
        }
    }

    /// Sets calendar options.
    #[must_use]
    pub fn with_options(mut self, options: PeriodOptions) -> Self {
        self.options = options;
        self
    }

    /// Drops buckets without activity.
    #[must_use]
    pub fn only_non_empty(mut self) -> Self {
        self.only_non_empty = true;
        self
    }
}

/// Read-only analytics over one stock's audit trail.
#[derive(Clone)]
pub struct StockAnalyticsService {
    audit_trail: Arc<dyn AuditTrailSource>,
    clock: Arc<dyn Clock>,
    record_limit: u32,
}

impl StockAnalyticsService {
    /// Creates a new service.
    #[must_use]
    pub fn new(audit_trail: Arc<dyn AuditTrailSource>, clock: Arc<dyn Clock>) -> Self {
        Self {
            audit_trail,
            clock,
            record_limit: DEFAULT_RECORD_LIMIT,
        }
    }

    /// Sets the audit record limit, clamped to `1..=MAX_RECORD_LIMIT`.
    #[must_use]
    pub fn with_record_limit(mut self, record_limit: u32) -> Self {
        self.record_limit = record_limit.clamp(1, MAX_RECORD_LIMIT);
        self
    }

    /// Returns the configured audit record limit.
    #[must_use]
    pub fn record_limit(&self) -> u32 {
        self.record_limit
    }

    /// Computes change statistics for each live shade, in shade order.
    pub async fn shade_analytics(
        &self,
        entity_id: &str,
        shades: &[Shade],
    ) -> AppResult<Vec<ShadeAnalytics>> {
        let records = self.records(entity_id).await?;
        Ok(compute_shade_analytics(shades, &records))
    }

    /// Computes change statistics for each live shade, most active first.
    pub async fn shade_ranking(
        &self,
        entity_id: &str,
        shades: &[Shade],
    ) -> AppResult<Vec<ShadeAnalytics>> {
        self.shade_analytics(entity_id, shades)
            .await
            .map(rank_by_total_changes)
    }

    /// Summarizes unit movement for one stock.
    ///
    /// Returns `None` when the stock has no audit records.
    pub async fn stock_activity(&self, entity_id: &str) -> AppResult<Option<StockActivitySummary>> {
        let records = self.records(entity_id).await?;
        Ok(compute_stock_activity(&records)
            .into_iter()
            .find(|summary| summary.entity_id == entity_id))
    }

    /// Builds the activity trend for one stock.
    pub async fn activity_periods(
        &self,
        entity_id: &str,
        shades: &[Shade],
        query: PeriodQuery,
    ) -> AppResult<Vec<PeriodBucket>> {
        let records = self.records(entity_id).await?;
        let buckets = build_periods(
            query.anchor,
            query.granularity,
            self.clock.now(),
            query.options,
        );
        let buckets = assign(&records, buckets, shades);

        Ok(if query.only_non_empty {
            non_empty(buckets)
        } else {
            buckets
        })
    }

    async fn records(&self, entity_id: &str) -> AppResult<Vec<AuditRecord>> {
        let entity_id = NonEmptyString::new(entity_id)?;
        let records = self
            .audit_trail
            .list_tracking_records(TrackingQuery {
                entity_id: entity_id.clone(),
                limit: self.record_limit,
            })
            .await?;

        debug!(
            entity_id = %entity_id,
            record_count = records.len(),
            "loaded stock audit trail"
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests;
