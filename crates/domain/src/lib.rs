//! Domain model and pure analytics for audit-trail reconstruction.

#![forbid(unsafe_code)]

mod alert;
mod analytics;
mod audit;
mod parser;
mod period;
mod shade;

pub use alert::{
    AlertFeed, AlertKind, AlertSnapshot, AlertThresholds, Notification, NotificationSeverity,
};
pub use analytics::{
    ShadeAnalytics, StockActivitySummary, compute_shade_analytics, compute_stock_activity,
    rank_by_total_changes,
};
pub use audit::{AuditAction, AuditRecord, chronological};
pub use parser::{
    AdjustmentDirection, ColorChange, ColorChangeEvent, StockAdjustment, StockAdjustmentEvent,
    extract_color_changes, extract_color_codes, extract_stock_adjustments,
};
pub use period::{
    Granularity, PeriodBucket, PeriodOptions, Periods, assign, build_periods, non_empty, periods,
};
pub use shade::{Shade, find_shade};
