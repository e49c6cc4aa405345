use std::collections::BTreeSet;

use async_trait::async_trait;
use stocklens_core::AppResult;
use stocklens_domain::Notification;

/// Durable key-value port holding the notification list and cleared alert keys.
///
/// Each collection lives under its own logical key and is replaced wholesale
/// on save.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Loads persisted notifications. A missing key yields an empty list.
    async fn load_notifications(&self) -> AppResult<Vec<Notification>>;

    /// Replaces persisted notifications.
    async fn save_notifications(&self, notifications: &[Notification]) -> AppResult<()>;

    /// Loads persisted cleared alert keys. A missing key yields an empty set.
    async fn load_cleared_keys(&self) -> AppResult<BTreeSet<String>>;

    /// Replaces persisted cleared alert keys.
    async fn save_cleared_keys(&self, cleared_keys: &BTreeSet<String>) -> AppResult<()>;
}
