//! Application services and ports.

#![forbid(unsafe_code)]

mod alert_inbox;
mod alert_polling;
mod analytics_service;
mod clock;
mod notification_ports;
mod tracking_ports;

pub use alert_inbox::{AlertInbox, PollOutcome, PollSummary};
pub use alert_polling::{AlertPollingHandle, spawn_alert_polling};
pub use analytics_service::{
    DEFAULT_RECORD_LIMIT, MAX_RECORD_LIMIT, PeriodQuery, StockAnalyticsService,
};
pub use clock::{Clock, SystemClock};
pub use notification_ports::NotificationStore;
pub use tracking_ports::{AlertSource, AuditTrailSource, TrackingQuery};
