use std::collections::HashSet;

use chrono::{DateTime, Utc};
use stocklens_domain::{AlertSnapshot, Notification};
use tracing::debug;

use super::{InboxState, PollSummary};

/// Applies one poll's snapshots to the inbox state.
///
/// This is the only place cleared keys are evicted: a cleared key survives
/// while the feed keeps reporting it and is dropped on the first poll that
/// does not. New notifications are inserted ahead of existing ones.
pub(super) fn reconcile(
    state: &mut InboxState,
    alerts: &[AlertSnapshot],
    now: DateTime<Utc>,
    mut next_id: impl FnMut() -> String,
) -> PollSummary {
    let mut summary = PollSummary::default();
    let mut reported: HashSet<String> = HashSet::with_capacity(alerts.len());
    let mut live: HashSet<String> = state
        .notifications
        .iter()
        .map(|notification| notification.alert_key.clone())
        .collect();
    let mut created = Vec::new();

    for snapshot in alerts {
        let alert_key = snapshot.alert_key();
        if !reported.insert(alert_key.clone()) {
            continue;
        }

        if state.cleared_keys.contains(&alert_key) {
            summary.suppressed += 1;
            continue;
        }

        if !live.insert(alert_key) {
            continue;
        }

        created.push(Notification::from_snapshot(next_id(), snapshot, now));
    }

    let cleared_before = state.cleared_keys.len();
    state
        .cleared_keys
        .retain(|alert_key| reported.contains(alert_key));
    summary.evicted = cleared_before - state.cleared_keys.len();
    if summary.evicted > 0 {
        debug!(
            evicted = summary.evicted,
            "resolved alert keys removed from cleared set"
        );
    }

    summary.created = created.len();
    created.reverse();
    state.notifications.splice(0..0, created);

    summary
}
