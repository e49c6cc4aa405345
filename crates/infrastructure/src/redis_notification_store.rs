//! Redis-backed notification store.

use std::collections::BTreeSet;

use async_trait::async_trait;
use redis::AsyncCommands;
use serde::Serialize;
use serde::de::DeserializeOwned;
use stocklens_application::NotificationStore;
use stocklens_core::{AppError, AppResult};
use stocklens_domain::Notification;

/// Redis implementation of the notification store port.
///
/// Each collection is one string key holding a JSON document.
#[derive(Clone)]
pub struct RedisNotificationStore {
    client: redis::Client,
    key_prefix: String,
}

impl RedisNotificationStore {
    /// Creates a store with a configured Redis client and key prefix.
    #[must_use]
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
        }
    }

    fn notifications_key(&self) -> String {
        format!("{}:notifications", self.key_prefix)
    }

    fn cleared_keys_key(&self) -> String {
        format!("{}:cleared_alert_keys", self.key_prefix)
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| AppError::Internal(format!("failed to connect to redis: {error}")))
    }

    async fn read_collection<T>(&self, key: String) -> AppResult<T>
    where
        T: DeserializeOwned + Default,
    {
        let mut connection = self.connection().await?;
        let encoded: Option<String> = connection.get(&key).await.map_err(|error| {
            AppError::Internal(format!("failed to read redis key '{key}': {error}"))
        })?;

        encoded.as_deref().map_or_else(
            || Ok(T::default()),
            |value| {
                serde_json::from_str(value).map_err(|error| {
                    AppError::Internal(format!("invalid value in redis key '{key}': {error}"))
                })
            },
        )
    }

    async fn write_collection<T>(&self, key: String, value: &T) -> AppResult<()>
    where
        T: Serialize + ?Sized,
    {
        let encoded = serde_json::to_string(value).map_err(|error| {
            AppError::Internal(format!("failed to encode redis key '{key}': {error}"))
        })?;

        let mut connection = self.connection().await?;
        connection
            .set::<_, _, ()>(&key, encoded)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to write redis key '{key}': {error}"))
            })
    }
}

#[async_trait]
impl NotificationStore for RedisNotificationStore {
    async fn load_notifications(&self) -> AppResult<Vec<Notification>> {
        self.read_collection(self.notifications_key()).await
    }

    async fn save_notifications(&self, notifications: &[Notification]) -> AppResult<()> {
        self.write_collection(self.notifications_key(), notifications)
            .await
    }

    async fn load_cleared_keys(&self) -> AppResult<BTreeSet<String>> {
        self.read_collection(self.cleared_keys_key()).await
    }

    async fn save_cleared_keys(&self, cleared_keys: &BTreeSet<String>) -> AppResult<()> {
        self.write_collection(self.cleared_keys_key(), cleared_keys)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::RedisNotificationStore;

    #[test]
    fn collection_keys_share_prefix() {
        let client = redis::Client::open("redis://127.0.0.1:6379");
        assert!(client.is_ok());
        let store =
            RedisNotificationStore::new(client.unwrap_or_else(|_| unreachable!()), "stocklens");

        assert_eq!(store.notifications_key(), "stocklens:notifications");
        assert_eq!(store.cleared_keys_key(), "stocklens:cleared_alert_keys");
    }
}
