use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};

use stocklens_domain::Notification;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::notification_ports::NotificationStore;

/// Copy of inbox state taken right after a mutation.
#[derive(Debug, Clone)]
pub(super) struct PersistSnapshot {
    pub(super) generation: u64,
    pub(super) notifications: Vec<Notification>,
    pub(super) cleared_keys: BTreeSet<String>,
}

/// Background writer that persists snapshots in generation order.
///
/// A snapshot older than the last written generation is dropped, so a slow
/// write can never overwrite newer state.
pub(super) struct PersistWriter {
    store: Arc<dyn NotificationStore>,
    last_written: tokio::sync::Mutex<u64>,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl PersistWriter {
    pub(super) fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self {
            store,
            last_written: tokio::sync::Mutex::new(0),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Spawns a write for `snapshot` without waiting for it.
    pub(super) fn schedule(self: &Arc<Self>, snapshot: PersistSnapshot) {
        let Ok(runtime) = Handle::try_current() else {
            warn!(
                generation = snapshot.generation,
                "no async runtime available, notification state not persisted"
            );
            return;
        };

        let writer = Arc::clone(self);
        let handle = runtime.spawn(async move { writer.write(snapshot).await });

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.retain(|handle| !handle.is_finished());
        pending.push(handle);
    }

    /// Waits for every write scheduled so far.
    pub(super) async fn flush(&self) {
        let handles = std::mem::take(
            &mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner),
        );

        for handle in handles {
            if let Err(error) = handle.await {
                warn!(error = %error, "notification persistence task failed");
            }
        }
    }

    async fn write(&self, snapshot: PersistSnapshot) {
        let mut last_written = self.last_written.lock().await;
        if snapshot.generation <= *last_written {
            return;
        }

        if let Err(error) = self
            .store
            .save_notifications(&snapshot.notifications)
            .await
        {
            warn!(
                generation = snapshot.generation,
                error = %error,
                "failed to persist notifications"
            );
        }

        if let Err(error) = self.store.save_cleared_keys(&snapshot.cleared_keys).await {
            warn!(
                generation = snapshot.generation,
                error = %error,
                "failed to persist cleared alert keys"
            );
        }

        *last_written = snapshot.generation;
    }
}
