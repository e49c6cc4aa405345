use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stocklens_core::AppError;

/// Threshold-breach category reported by the alert feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertKind {
    /// A shade fell below the low-shade threshold.
    LowShade,
    /// A shade rose above the high-shade threshold.
    HighShade,
    /// A stock fell below the low-stock threshold.
    LowStock,
}

impl AlertKind {
    /// Returns the stable value used in alert keys.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LowShade => "LOW_SHADE",
            Self::HighShade => "HIGH_SHADE",
            Self::LowStock => "LOW_STOCK",
        }
    }

    /// Returns the notification severity for this kind.
    #[must_use]
    pub fn severity(&self) -> NotificationSeverity {
        match self {
            Self::LowShade => NotificationSeverity::Warning,
            Self::HighShade => NotificationSeverity::Info,
            Self::LowStock => NotificationSeverity::Critical,
        }
    }
}

impl FromStr for AlertKind {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "LOW_SHADE" => Ok(Self::LowShade),
            "HIGH_SHADE" => Ok(Self::HighShade),
            "LOW_STOCK" => Ok(Self::LowStock),
            _ => Err(AppError::Validation(format!(
                "unknown alert kind value '{value}'"
            ))),
        }
    }
}

/// One threshold breach as reported by the latest poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertSnapshot {
    /// Breach category.
    pub kind: AlertKind,
    /// Stock the alert refers to.
    pub entity_id: String,
    /// Shade the alert refers to, for shade-level alerts.
    pub shade_id: Option<String>,
    /// Product display name.
    pub product: String,
    /// Quantity at the time of the poll.
    pub quantity: i64,
    /// Stock or shade code.
    pub code: Option<String>,
}

impl AlertSnapshot {
    /// Returns the stable identity of the breach condition.
    ///
    /// The key is `kind:shade_id`, falling back to `kind:entity_id` for
    /// stock-level alerts.
    #[must_use]
    pub fn alert_key(&self) -> String {
        let subject = self.shade_id.as_deref().unwrap_or(self.entity_id.as_str());
        format!("{}:{subject}", self.kind.as_str())
    }

    /// Returns the user-facing notification message.
    #[must_use]
    pub fn message(&self) -> String {
        let code = self.code.as_deref().unwrap_or("-");
        match self.kind {
            AlertKind::LowShade => format!(
                "Low shade stock: {} shade {code} has {} left",
                self.product, self.quantity
            ),
            AlertKind::HighShade => format!(
                "High shade stock: {} shade {code} has {} on hand",
                self.product, self.quantity
            ),
            AlertKind::LowStock => format!(
                "Low stock: {} ({code}) has {} left",
                self.product, self.quantity
            ),
        }
    }
}

/// Threshold metadata returned alongside the alert lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertThresholds {
    /// Quantity under which a shade is reported low.
    pub low_shade: Option<i64>,
    /// Quantity above which a shade is reported high.
    pub high_shade: Option<i64>,
    /// Quantity under which a stock is reported low.
    pub low_stock: Option<i64>,
}

/// Result of one alert poll.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertFeed {
    /// Every breach currently reported, across all kinds.
    pub alerts: Vec<AlertSnapshot>,
    /// Thresholds in effect for this poll.
    pub thresholds: AlertThresholds,
}

/// Severity shown with a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationSeverity {
    /// Informational.
    Info,
    /// Needs attention soon.
    Warning,
    /// Needs attention now.
    Critical,
}

/// User-facing notification derived from an alert snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Notification identifier.
    pub id: String,
    /// Identity of the breach condition this notification reports.
    pub alert_key: String,
    /// User-facing message.
    pub message: String,
    /// Display severity.
    pub severity: NotificationSeverity,
    /// When the notification was created.
    pub timestamp: DateTime<Utc>,
    /// Whether the user has read the notification.
    pub read: bool,
    /// Stock the notification links to.
    pub stock_ref: String,
}

impl Notification {
    /// Creates an unread notification for `snapshot`.
    #[must_use]
    pub fn from_snapshot(
        id: impl Into<String>,
        snapshot: &AlertSnapshot,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            alert_key: snapshot.alert_key(),
            message: snapshot.message(),
            severity: snapshot.kind.severity(),
            timestamp,
            read: false,
            stock_ref: snapshot.entity_id.clone(),
        }
    }
}
