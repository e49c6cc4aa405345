use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use stocklens_application::NotificationStore;
use stocklens_core::{AppError, AppResult};
use stocklens_domain::Notification;
use tokio::fs;

const NOTIFICATIONS_FILE: &str = "notifications.json";
const CLEARED_KEYS_FILE: &str = "cleared_alert_keys.json";

/// Notification store keeping each collection in a JSON file under one
/// directory.
///
/// Writes go through a temporary file and a rename, so a crash mid-write
/// leaves the previous contents readable.
#[derive(Debug, Clone)]
pub struct JsonFileNotificationStore {
    directory: PathBuf,
}

impl JsonFileNotificationStore {
    /// Creates a store rooted at `directory`. The directory is created on
    /// first write.
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Returns the storage directory.
    #[must_use]
    pub fn directory(&self) -> &Path {
        self.directory.as_path()
    }

    async fn read_collection<T>(&self, file_name: &str) -> AppResult<T>
    where
        T: DeserializeOwned + Default,
    {
        let path = self.directory.join(file_name);
        let contents = match fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(T::default()),
            Err(error) => {
                return Err(AppError::Internal(format!(
                    "failed to read '{}': {error}",
                    path.display()
                )));
            }
        };

        serde_json::from_str(contents.as_str()).map_err(|error| {
            AppError::Internal(format!("failed to parse '{}': {error}", path.display()))
        })
    }

    async fn write_collection<T>(&self, file_name: &str, value: &T) -> AppResult<()>
    where
        T: Serialize + ?Sized,
    {
        let encoded = serde_json::to_vec_pretty(value).map_err(|error| {
            AppError::Internal(format!("failed to encode '{file_name}': {error}"))
        })?;

        fs::create_dir_all(&self.directory).await.map_err(|error| {
            AppError::Internal(format!(
                "failed to create '{}': {error}",
                self.directory.display()
            ))
        })?;

        let path = self.directory.join(file_name);
        let staging = self.directory.join(format!("{file_name}.tmp"));
        fs::write(&staging, encoded).await.map_err(|error| {
            AppError::Internal(format!("failed to write '{}': {error}", staging.display()))
        })?;
        fs::rename(&staging, &path).await.map_err(|error| {
            AppError::Internal(format!("failed to replace '{}': {error}", path.display()))
        })
    }
}

#[async_trait]
impl NotificationStore for JsonFileNotificationStore {
    async fn load_notifications(&self) -> AppResult<Vec<Notification>> {
        self.read_collection(NOTIFICATIONS_FILE).await
    }

    async fn save_notifications(&self, notifications: &[Notification]) -> AppResult<()> {
        self.write_collection(NOTIFICATIONS_FILE, notifications)
            .await
    }

    async fn load_cleared_keys(&self) -> AppResult<BTreeSet<String>> {
        self.read_collection(CLEARED_KEYS_FILE).await
    }

    async fn save_cleared_keys(&self, cleared_keys: &BTreeSet<String>) -> AppResult<()> {
        self.write_collection(CLEARED_KEYS_FILE, cleared_keys).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    use chrono::{TimeZone, Utc};
    use stocklens_application::NotificationStore;
    use stocklens_domain::{AlertKind, AlertSnapshot, Notification};
    use uuid::Uuid;

    use super::{CLEARED_KEYS_FILE, JsonFileNotificationStore, NOTIFICATIONS_FILE};

    struct ScratchDir(PathBuf);

    impl ScratchDir {
        fn new() -> Self {
            Self(std::env::temp_dir().join(format!("stocklens-store-{}", Uuid::new_v4())))
        }
    }

    impl Drop for ScratchDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.0);
        }
    }

    fn notification() -> Notification {
        let snapshot = AlertSnapshot {
            kind: AlertKind::LowShade,
            entity_id: "stock-1".to_owned(),
            shade_id: Some("shade-1".to_owned()),
            product: "Cotton Yarn".to_owned(),
            quantity: 2,
            code: Some("#ff0000".to_owned()),
        };
        let timestamp = Utc
            .with_ymd_and_hms(2026, 10, 18, 9, 0, 0)
            .single()
            .unwrap_or_else(|| unreachable!());
        Notification::from_snapshot("n-1", &snapshot, timestamp)
    }

    #[tokio::test]
    async fn missing_files_load_as_empty() {
        let scratch = ScratchDir::new();
        let store = JsonFileNotificationStore::new(&scratch.0);

        let notifications = store.load_notifications().await;
        let cleared = store.load_cleared_keys().await;

        assert!(notifications.is_ok_and(|items| items.is_empty()));
        assert!(cleared.is_ok_and(|keys| keys.is_empty()));
    }

    #[tokio::test]
    async fn saved_collections_survive_a_new_store() {
        let scratch = ScratchDir::new();
        let writer = JsonFileNotificationStore::new(&scratch.0);
        let notifications = vec![notification()];
        let cleared = BTreeSet::from(["LOW_STOCK:stock-7".to_owned()]);

        assert!(writer.save_notifications(&notifications).await.is_ok());
        assert!(writer.save_cleared_keys(&cleared).await.is_ok());

        let reader = JsonFileNotificationStore::new(&scratch.0);
        let loaded = reader.load_notifications().await;
        assert!(loaded.is_ok());
        assert_eq!(loaded.unwrap_or_else(|_| unreachable!()), notifications);
        let loaded = reader.load_cleared_keys().await;
        assert!(loaded.is_ok());
        assert_eq!(loaded.unwrap_or_else(|_| unreachable!()), cleared);
        assert!(!scratch.0.join(format!("{NOTIFICATIONS_FILE}.tmp")).exists());
    }

    #[tokio::test]
    async fn corrupt_file_is_reported_as_error() {
        let scratch = ScratchDir::new();
        assert!(std::fs::create_dir_all(&scratch.0).is_ok());
        assert!(std::fs::write(scratch.0.join(CLEARED_KEYS_FILE), "{not json").is_ok());
        let store = JsonFileNotificationStore::new(&scratch.0);

        let cleared = store.load_cleared_keys().await;

        assert!(cleared.is_err());
    }
}
