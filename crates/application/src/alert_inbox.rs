//! Deduplicated, persisted notification stream fed by alert polling.
//!
//! Every alert key moves through `unseen -> active -> (read | cleared)`. A
//! cleared key is suppressed until a completed poll no longer reports it, after
//! which a recurrence notifies again. At most one live notification exists per
//! alert key.

use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use stocklens_core::AppError;
use stocklens_domain::Notification;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::notification_ports::NotificationStore;
use crate::tracking_ports::AlertSource;

mod persistence;
mod reconcile;

use persistence::{PersistSnapshot, PersistWriter};
use reconcile::reconcile;

/// Counts produced by one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    /// Notifications created for newly observed keys.
    pub created: usize,
    /// Snapshots suppressed because their key was cleared.
    pub suppressed: usize,
    /// Cleared keys evicted because the poll no longer reported them.
    pub evicted: usize,
}

impl PollSummary {
    fn changed_state(&self) -> bool {
        self.created > 0 || self.evicted > 0
    }
}

/// Result of one [`AlertInbox::poll`] call.
#[derive(Debug)]
pub enum PollOutcome {
    /// The feed was fetched and reconciled.
    Completed(PollSummary),
    /// Another poll was in flight; nothing was fetched.
    Skipped,
    /// The fetch failed; state is unchanged.
    Failed(AppError),
    /// The inbox was disposed before the result could be applied.
    Discarded,
}

#[derive(Debug, Default)]
struct InboxState {
    notifications: Vec<Notification>,
    cleared_keys: BTreeSet<String>,
    generation: u64,
}

impl InboxState {
    fn restore(notifications: Vec<Notification>, cleared_keys: BTreeSet<String>) -> Self {
        let mut seen = HashSet::new();
        let notifications = notifications
            .into_iter()
            .filter(|notification| seen.insert(notification.alert_key.clone()))
            .collect();

        Self {
            notifications,
            cleared_keys,
            generation: 0,
        }
    }

    fn snapshot(&mut self) -> PersistSnapshot {
        self.generation = self.generation.saturating_add(1);
        PersistSnapshot {
            generation: self.generation,
            notifications: self.notifications.clone(),
            cleared_keys: self.cleared_keys.clone(),
        }
    }
}

/// Alert deduplication store.
///
/// The notification list and cleared-key set are owned here; callers read
/// copies and mutate only through the methods below. Mutations apply to memory
/// immediately and persist in the background. [`AlertInbox::poll`] waits for
/// outstanding writes before fetching.
pub struct AlertInbox {
    source: Arc<dyn AlertSource>,
    clock: Arc<dyn Clock>,
    state: Mutex<InboxState>,
    writer: Arc<PersistWriter>,
    in_flight: AtomicBool,
    disposed: AtomicBool,
}

impl AlertInbox {
    /// Creates an inbox from persisted state.
    ///
    /// Unreadable persisted collections are replaced with empty ones.
    pub async fn initialize(
        source: Arc<dyn AlertSource>,
        store: Arc<dyn NotificationStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let notifications = store.load_notifications().await.unwrap_or_else(|error| {
            warn!(error = %error, "failed to load persisted notifications, starting empty");
            Vec::new()
        });
        let cleared_keys = store.load_cleared_keys().await.unwrap_or_else(|error| {
            warn!(error = %error, "failed to load cleared alert keys, starting empty");
            BTreeSet::new()
        });

        Self {
            source,
            clock,
            state: Mutex::new(InboxState::restore(notifications, cleared_keys)),
            writer: Arc::new(PersistWriter::new(store)),
            in_flight: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
        }
    }

    /// Returns the live notifications, newest first.
    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        self.lock_state().notifications.clone()
    }

    /// Returns the cleared alert keys.
    #[must_use]
    pub fn cleared_keys(&self) -> Vec<String> {
        self.lock_state().cleared_keys.iter().cloned().collect()
    }

    /// Returns the number of unread notifications.
    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.lock_state()
            .notifications
            .iter()
            .filter(|notification| !notification.read)
            .count()
    }

    /// Marks one notification as read. Returns whether anything changed.
    pub fn mark_as_read(&self, notification_id: &str) -> bool {
        self.mutate(|state| {
            match state
                .notifications
                .iter_mut()
                .find(|notification| notification.id == notification_id && !notification.read)
            {
                Some(notification) => {
                    notification.read = true;
                    true
                }
                None => false,
            }
        })
    }

    /// Marks every notification as read. Returns how many changed.
    pub fn mark_all_as_read(&self) -> usize {
        let mut changed = 0;
        self.mutate(|state| {
            for notification in state.notifications.iter_mut().filter(|item| !item.read) {
                notification.read = true;
                changed += 1;
            }
            changed > 0
        });
        changed
    }

    /// Removes one notification and suppresses its alert key until it resolves.
    ///
    /// Returns whether a notification was removed.
    pub fn clear(&self, notification_id: &str) -> bool {
        self.mutate(|state| {
            let Some(position) = state
                .notifications
                .iter()
                .position(|notification| notification.id == notification_id)
            else {
                return false;
            };

            let notification = state.notifications.remove(position);
            debug!(alert_key = %notification.alert_key, "alert notification cleared");
            state.cleared_keys.insert(notification.alert_key);
            true
        })
    }

    /// Clears every notification. Returns how many were removed.
    pub fn clear_all(&self) -> usize {
        let mut removed = 0;
        self.mutate(|state| {
            removed = state.notifications.len();
            let keys: Vec<String> = state
                .notifications
                .drain(..)
                .map(|notification| notification.alert_key)
                .collect();
            state.cleared_keys.extend(keys);
            removed > 0
        });
        removed
    }

    /// Fetches the alert feed and reconciles it into the notification list.
    ///
    /// Concurrent calls are skipped rather than queued. A failed fetch leaves
    /// state untouched and is retried by the next scheduled poll.
    pub async fn poll(&self) -> PollOutcome {
        if self.is_disposed() {
            return PollOutcome::Discarded;
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("alert poll already in flight, skipping");
            return PollOutcome::Skipped;
        }
        let _in_flight = InFlightGuard(&self.in_flight);

        self.writer.flush().await;

        let feed = match self.source.fetch_alerts().await {
            Ok(feed) => feed,
            Err(error) => {
                warn!(error = %error, "failed to fetch alert feed");
                return PollOutcome::Failed(error);
            }
        };

        if self.is_disposed() {
            debug!("alert inbox disposed during poll, discarding result");
            return PollOutcome::Discarded;
        }

        let now = self.clock.now();
        let (summary, snapshot) = {
            let mut state = self.lock_state();
            let summary = reconcile(&mut state, &feed.alerts, now, || {
                Uuid::new_v4().to_string()
            });
            let snapshot = summary.changed_state().then(|| state.snapshot());
            (summary, snapshot)
        };

        if let Some(snapshot) = snapshot {
            self.writer.schedule(snapshot);
        }

        if summary.created > 0 {
            info!(
                created = summary.created,
                suppressed = summary.suppressed,
                evicted = summary.evicted,
                "alert notifications created"
            );
        }

        PollOutcome::Completed(summary)
    }

    /// Marks the inbox as disposed; later and in-flight polls are discarded.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
    }

    /// Returns whether the inbox has been disposed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Waits for every scheduled persistence write to finish.
    pub async fn flush(&self) {
        self.writer.flush().await;
    }

    fn mutate(&self, apply: impl FnOnce(&mut InboxState) -> bool) -> bool {
        let snapshot = {
            let mut state = self.lock_state();
            if !apply(&mut *state) {
                return false;
            }
            state.snapshot()
        };

        self.writer.schedule(snapshot);
        true
    }

    fn lock_state(&self) -> MutexGuard<'_, InboxState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
