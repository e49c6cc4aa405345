use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use stocklens_core::AppError;

/// Action recorded by the upstream tracking service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    /// A stock item and its initial shades were created.
    Create,
    /// Stock fields or shade quantities were edited.
    Update,
    /// Stock quantity was incremented or decremented.
    Adjust,
    /// A stock item was deleted.
    Delete,
    /// An image was attached to a stock item.
    ImageUpload,
}

impl AuditAction {
    /// Returns the stable transport value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Adjust => "ADJUST",
            Self::Delete => "DELETE",
            Self::ImageUpload => "IMAGE_UPLOAD",
        }
    }
}

impl FromStr for AuditAction {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "CREATE" => Ok(Self::Create),
            "UPDATE" => Ok(Self::Update),
            "ADJUST" => Ok(Self::Adjust),
            "DELETE" => Ok(Self::Delete),
            "IMAGE_UPLOAD" => Ok(Self::ImageUpload),
            _ => Err(AppError::Validation(format!(
                "unknown audit action value '{value}'"
            ))),
        }
    }
}

/// One immutable entry of the upstream audit trail.
///
/// Records are read-only input: the engine derives events from them on demand
/// and never writes them back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    /// Record identifier assigned by the tracking service.
    pub id: String,
    /// Stock the record refers to.
    pub entity_id: String,
    /// Recorded action.
    pub action: AuditAction,
    /// Free-text change description.
    #[serde(default)]
    pub description: String,
    /// Opaque snapshot before the change.
    #[serde(default)]
    pub old_data: Option<Value>,
    /// Opaque snapshot after the change.
    #[serde(default)]
    pub new_data: Option<Value>,
    /// Subject that performed the change.
    #[serde(default)]
    pub performed_by: Option<String>,
    /// When the change happened.
    pub performed_at: DateTime<Utc>,
}

impl AuditRecord {
    /// Creates a record with empty data snapshots.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        entity_id: impl Into<String>,
        action: AuditAction,
        description: impl Into<String>,
        performed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            entity_id: entity_id.into(),
            action,
            description: description.into(),
            old_data: None,
            new_data: None,
            performed_by: None,
            performed_at,
        }
    }

    /// Sets the subject that performed the change.
    #[must_use]
    pub fn with_performed_by(mut self, performed_by: impl Into<String>) -> Self {
        self.performed_by = Some(performed_by.into());
        self
    }
}

/// Returns references to `records` ordered by ascending `performed_at`.
///
/// The sort is stable, so records sharing a timestamp keep their input order.
#[must_use]
pub fn chronological(records: &[AuditRecord]) -> Vec<&AuditRecord> {
    let mut ordered: Vec<&AuditRecord> = records.iter().collect();
    ordered.sort_by_key(|record| record.performed_at);
    ordered
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::{TimeZone, Utc};

    use super::{AuditAction, AuditRecord, chronological};

    #[test]
    fn audit_action_roundtrip_transport_value() {
        let action = AuditAction::ImageUpload;
        let restored = AuditAction::from_str(action.as_str());
        assert!(restored.is_ok());
        assert_eq!(restored.unwrap_or(AuditAction::Create), action);
    }

    #[test]
    fn unknown_audit_action_is_rejected() {
        assert!(AuditAction::from_str("RENAME").is_err());
    }

    #[test]
    fn audit_record_deserializes_from_camel_case_payload() {
        let payload = serde_json::json!({
            "id": "rec-1",
            "entityId": "stock-1",
            "action": "UPDATE",
            "description": "#ff0000: quantity: 10 → 8 (-2)",
            "oldData": {"quantity": 10},
            "newData": {"quantity": 8},
            "performedBy": "alice",
            "performedAt": "2026-03-04T10:15:00Z"
        });

        let record = serde_json::from_value::<AuditRecord>(payload);
        assert!(record.is_ok());
        let record = record.unwrap_or_else(|_| unreachable!());
        assert_eq!(record.action, AuditAction::Update);
        assert_eq!(record.entity_id, "stock-1");
        assert_eq!(record.performed_by.as_deref(), Some("alice"));
    }

    #[test]
    fn chronological_orders_by_timestamp_and_keeps_ties_stable() {
        let early = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).single();
        let late = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).single();
        let (Some(early), Some(late)) = (early, late) else {
            unreachable!()
        };
        let records = vec![
            AuditRecord::new("c", "s", AuditAction::Update, "", late),
            AuditRecord::new("a", "s", AuditAction::Update, "", early),
            AuditRecord::new("b", "s", AuditAction::Update, "", early),
        ];

        let ids: Vec<&str> = chronological(&records)
            .into_iter()
            .map(|record| record.id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
