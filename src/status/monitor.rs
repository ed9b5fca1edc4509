//! Background re-check loop for one subject.

use super::{refresh_interval, ConnectionStatus, StatusPoller};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Handle to a running monitor. Dropping it aborts the loop.
pub struct StatusMonitor {
    subject: String,
    stop: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl StatusMonitor {
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Ask the loop to stop and wait for it to finish.
    pub async fn stop(mut self) {
        let _ = self.stop.send(true);
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for StatusMonitor {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

pub(super) fn spawn(poller: Arc<StatusPoller>, subject: String) -> StatusMonitor {
    let (stop_tx, stop_rx) = watch::channel(false);
    let handle = tokio::spawn(run(poller, subject.clone(), stop_rx));
    StatusMonitor {
        subject,
        stop: stop_tx,
        handle: Some(handle),
    }
}

/// Check, then wait until the observed status goes stale, which is the
/// interval of that status when this check fetched it. A status change
/// published by anyone else restarts the wait with the new interval.
async fn run(poller: Arc<StatusPoller>, subject: String, mut stop: watch::Receiver<bool>) {
    let mut updates = poller.subscribe(&subject);
    debug!(subject = %subject, "status monitor started");

    loop {
        let checked = tokio::select! {
            _ = stop.changed() => break,
            checked = poller.check(&subject, false) => checked,
        };
        let status = match checked {
            Ok(status) => status,
            Err(e) => {
                if poller.cache().is_closed() {
                    debug!(subject = %subject, "cache closed; status monitor exiting");
                    break;
                }
                warn!(subject = %subject, error = %e, "status check failed");
                ConnectionStatus::error(e.to_string())
            }
        };
        updates.borrow_and_update();

        // A status cached earlier by another caller goes stale sooner
        let interval = poller
            .until_stale(&subject)
            .unwrap_or_else(|| refresh_interval(status.state, poller.config()));
        debug!(
            subject = %subject,
            state = %status.state,
            interval_secs = interval.as_secs(),
            "next status check scheduled"
        );

        tokio::select! {
            _ = stop.changed() => break,
            _ = tokio::time::sleep(interval) => {}
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    debug!(subject = %subject, "status monitor stopped");
}
