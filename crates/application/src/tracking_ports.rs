use async_trait::async_trait;
use stocklens_core::{AppResult, NonEmptyString};
use stocklens_domain::{AlertFeed, AuditRecord};

/// Audit trail query for one stock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingQuery {
    /// Stock whose records are requested.
    pub entity_id: NonEmptyString,
    /// Maximum number of records to return.
    pub limit: u32,
}

/// Read-only port over the upstream audit trail.
#[async_trait]
pub trait AuditTrailSource: Send + Sync {
    /// Lists tracking records for one stock, in no guaranteed order.
    async fn list_tracking_records(&self, query: TrackingQuery) -> AppResult<Vec<AuditRecord>>;
}

/// Read-only port over the upstream alert feed.
#[async_trait]
pub trait AlertSource: Send + Sync {
    /// Fetches every currently reported threshold breach.
    async fn fetch_alerts(&self) -> AppResult<AlertFeed>;
}
