use std::collections::BTreeSet;

use async_trait::async_trait;
use stocklens_application::NotificationStore;
use stocklens_core::AppResult;
use stocklens_domain::Notification;
use tokio::sync::RwLock;

/// In-memory notification store for tests and single-process runs.
#[derive(Default)]
pub struct InMemoryNotificationStore {
    notifications: RwLock<Vec<Notification>>,
    cleared_keys: RwLock<BTreeSet<String>>,
}

impl InMemoryNotificationStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn load_notifications(&self) -> AppResult<Vec<Notification>> {
        Ok(self.notifications.read().await.clone())
    }

    async fn save_notifications(&self, notifications: &[Notification]) -> AppResult<()> {
        *self.notifications.write().await = notifications.to_vec();
        Ok(())
    }

    async fn load_cleared_keys(&self) -> AppResult<BTreeSet<String>> {
        Ok(self.cleared_keys.read().await.clone())
    }

    async fn save_cleared_keys(&self, cleared_keys: &BTreeSet<String>) -> AppResult<()> {
        self.cleared_keys.write().await.clone_from(cleared_keys);
        Ok(())
    }
}
