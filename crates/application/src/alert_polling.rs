use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::alert_inbox::{AlertInbox, PollOutcome};

const MIN_POLL_PERIOD: Duration = Duration::from_millis(1);

/// Handle to a running alert polling task.
pub struct AlertPollingHandle {
    inbox: Arc<AlertInbox>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl AlertPollingHandle {
    /// Disposes the inbox, stops the loop and waits for it to exit.
    ///
    /// A poll in flight when this is called is discarded, and pending
    /// persistence writes are flushed before returning.
    pub async fn shutdown(self) {
        self.inbox.dispose();
        let _ = self.shutdown.send(true);

        if let Err(error) = self.task.await {
            warn!(error = %error, "alert polling task terminated abnormally");
        }
        self.inbox.flush().await;
    }
}

/// Polls `inbox` immediately and then once per `period`.
///
/// Ticks that fall due while a poll is still running are skipped, not queued.
#[must_use]
pub fn spawn_alert_polling(inbox: Arc<AlertInbox>, period: Duration) -> AlertPollingHandle {
    let (shutdown, mut shutdown_signal) = watch::channel(false);
    let period = period.max(MIN_POLL_PERIOD);
    let polled = Arc::clone(&inbox);

    let task = tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(period_ms = period.as_millis(), "alert polling started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown_signal.changed() => {
                    if changed.is_err() || *shutdown_signal.borrow() {
                        break;
                    }
                    continue;
                }
            }

            match polled.poll().await {
                PollOutcome::Completed(summary) => {
                    debug!(
                        created = summary.created,
                        suppressed = summary.suppressed,
                        evicted = summary.evicted,
                        "alert poll completed"
                    );
                }
                PollOutcome::Skipped => debug!("alert poll skipped"),
                PollOutcome::Failed(error) => {
                    debug!(error = %error, "alert poll failed, retrying next tick");
                }
                PollOutcome::Discarded => break,
            }
        }

        info!("alert polling stopped");
    });

    AlertPollingHandle {
        inbox,
        shutdown,
        task,
    }
}
