//! Cached, throttled status checks per subject.

use super::monitor::{self, StatusMonitor};
use super::{
    refresh_interval, ConnectionStatus, ConnectionStatusProvider, PollerConfig, RawStatusPayload,
};
use crate::cache::CacheService;
use crate::error::StatusError;
use crate::types::STATUS_NAMESPACE;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

type LastFetch = Arc<Mutex<HashMap<String, Instant>>>;

/// Polls an external provider for connection statuses.
///
/// Statuses are cached in the `conn-status` namespace with a TTL chosen by
/// [`refresh_interval`]; provider fetches for one subject are spaced at least
/// `throttle_secs` apart, forced checks included.
pub struct StatusPoller {
    cache: CacheService,
    provider: Arc<dyn ConnectionStatusProvider>,
    config: PollerConfig,
    last_fetch: LastFetch,
    channels: Mutex<HashMap<String, watch::Sender<Option<ConnectionStatus>>>>,
}

impl StatusPoller {
    pub fn new(
        cache: CacheService,
        provider: Arc<dyn ConnectionStatusProvider>,
        config: PollerConfig,
    ) -> Self {
        Self {
            cache,
            provider,
            config,
            last_fetch: Arc::new(Mutex::new(HashMap::new())),
            channels: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    pub fn cache(&self) -> &CacheService {
        &self.cache
    }

    /// Current status of `subject`.
    ///
    /// A fresh cached status is returned unless `force`. Within the throttle
    /// window of the previous fetch the last known status is returned instead
    /// of fetching, and a fetch already in flight is awaited rather than
    /// repeated. Provider failures yield an `Error` status, cached for the
    /// error interval.
    pub async fn check(&self, subject: &str, force: bool) -> Result<ConnectionStatus, StatusError> {
        if !force {
            if let Some(status) = self.cache.peek::<ConnectionStatus>(STATUS_NAMESPACE, subject)? {
                return Ok(status);
            }
        }

        let throttled = self.is_throttled(subject);
        if throttled {
            if let Some(status) = self.latest(subject) {
                debug!(subject = %subject, force, "status fetch throttled");
                return Ok(status);
            }
        }

        // A fetch in flight is joined, never replaced
        let in_flight = self.cache.is_pending(STATUS_NAMESPACE, subject);
        if force && !throttled && !in_flight {
            self.cache.invalidate(STATUS_NAMESPACE, Some(subject));
        }

        let provider = Arc::clone(&self.provider);
        let last_fetch = Arc::clone(&self.last_fetch);
        let config = self.config.clone();
        let id = subject.to_string();
        let status = self
            .cache
            .get_or_set_with(
                STATUS_NAMESPACE,
                subject,
                move |status: &ConnectionStatus| refresh_interval(status.state, &config),
                move || fetch_status(provider, last_fetch, id),
            )
            .await?;

        self.publish(subject, &status);
        Ok(status)
    }

    /// Ask the provider for a pairing artifact. Bypasses cache and throttle.
    pub async fn request_pairing(&self, subject: &str) -> Result<String, StatusError> {
        let artifact = self.provider.request_pairing(subject).await.map_err(|e| match e {
            StatusError::Upstream(_) => e,
            other => StatusError::Upstream(other.to_string()),
        })?;

        let status = ConnectionStatus::awaiting_pairing(artifact.clone());
        self.store(subject, &status)?;
        info!(subject = %subject, "pairing requested");
        Ok(artifact)
    }

    /// Disconnect the subject's session and reset its status to `Disconnected`.
    ///
    /// The local reset happens even when the provider call fails; the failure
    /// is still returned.
    pub async fn disconnect(&self, subject: &str) -> Result<(), StatusError> {
        self.cache.invalidate(STATUS_NAMESPACE, Some(subject));
        let result = self.provider.disconnect(subject).await;
        if let Err(e) = &result {
            warn!(subject = %subject, error = %e, "provider disconnect failed");
        }
        self.store(subject, &ConnectionStatus::disconnected())?;
        result
    }

    /// Receiver of the latest status of `subject`; `None` until first observed.
    pub fn subscribe(&self, subject: &str) -> watch::Receiver<Option<ConnectionStatus>> {
        self.with_sender(subject, |sender| sender.subscribe())
    }

    /// Last status observed for `subject`, fresh or not.
    pub fn latest(&self, subject: &str) -> Option<ConnectionStatus> {
        self.channels
            .lock()
            .get(subject)
            .and_then(|sender| sender.borrow().clone())
    }

    /// Start a background monitor re-checking `subject` at the interval of its
    /// current status.
    pub fn spawn_monitor(self: &Arc<Self>, subject: &str) -> StatusMonitor {
        monitor::spawn(Arc::clone(self), subject.to_string())
    }

    /// Time until the cached status of `subject` goes stale, if it is fresh.
    pub fn until_stale(&self, subject: &str) -> Option<Duration> {
        self.cache.remaining_ttl(STATUS_NAMESPACE, subject)
    }

    fn is_throttled(&self, subject: &str) -> bool {
        self.last_fetch
            .lock()
            .get(subject)
            .map(|at| at.elapsed() < self.config.throttle())
            .unwrap_or(false)
    }

    fn store(&self, subject: &str, status: &ConnectionStatus) -> Result<(), StatusError> {
        let ttl = refresh_interval(status.state, &self.config);
        self.cache
            .set(STATUS_NAMESPACE, subject, status.clone(), ttl)?;
        self.publish(subject, status);
        Ok(())
    }

    fn with_sender<R>(
        &self,
        subject: &str,
        f: impl FnOnce(&watch::Sender<Option<ConnectionStatus>>) -> R,
    ) -> R {
        let mut channels = self.channels.lock();
        let sender = channels
            .entry(subject.to_string())
            .or_insert_with(|| watch::channel(None).0);
        f(sender)
    }

    /// Notify subscribers when the status changed.
    fn publish(&self, subject: &str, status: &ConnectionStatus) {
        self.with_sender(subject, |sender| {
            sender.send_if_modified(|current| {
                if current.as_ref() == Some(status) {
                    return false;
                }
                debug!(
                    subject = %subject,
                    from = ?current.as_ref().map(|s| s.state),
                    to = %status.state,
                    "connection status changed"
                );
                *current = Some(status.clone());
                true
            });
        });
    }
}

/// One provider fetch. Never fails: provider and mapping errors become an
/// `Error` status.
async fn fetch_status(
    provider: Arc<dyn ConnectionStatusProvider>,
    last_fetch: LastFetch,
    subject: String,
) -> Result<ConnectionStatus, StatusError> {
    last_fetch.lock().insert(subject.clone(), Instant::now());
    match provider
        .fetch(&subject)
        .await
        .and_then(RawStatusPayload::into_status)
    {
        Ok(status) => {
            debug!(subject = %subject, state = %status.state, "status fetched");
            Ok(status)
        }
        Err(e) => {
            warn!(subject = %subject, error = %e, "status fetch failed");
            Ok(ConnectionStatus::error(e.to_string()))
        }
    }
}
