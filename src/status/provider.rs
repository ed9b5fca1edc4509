//! Connection status provider port and a scripted in-memory provider.

use super::RawStatusPayload;
use crate::error::StatusError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// External collaborator that owns messaging sessions.
#[async_trait]
pub trait ConnectionStatusProvider: Send + Sync {
    /// Current raw status of `subject`'s session.
    async fn fetch(&self, subject: &str) -> Result<RawStatusPayload, StatusError>;

    /// Start pairing and return the artifact the user scans.
    async fn request_pairing(&self, subject: &str) -> Result<String, StatusError>;

    async fn disconnect(&self, subject: &str) -> Result<(), StatusError>;
}

/// Provider answering from per-subject queues of scripted responses.
///
/// When a subject's queue holds one response it is repeated; otherwise
/// responses are consumed in order. Subjects without a script fail.
#[derive(Debug, Default)]
pub struct ScriptedStatusProvider {
    scripts: Mutex<HashMap<String, VecDeque<Result<RawStatusPayload, StatusError>>>>,
    pairing: Mutex<HashMap<String, Result<String, StatusError>>>,
    fetches: AtomicUsize,
    pairings: AtomicUsize,
    disconnects: AtomicUsize,
    latency: Mutex<Option<Duration>>,
}

impl ScriptedStatusProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for `subject`.
    pub fn push(&self, subject: &str, response: Result<RawStatusPayload, StatusError>) {
        self.scripts
            .lock()
            .entry(subject.to_string())
            .or_default()
            .push_back(response);
    }

    /// Replace `subject`'s queue with a single repeating state.
    pub fn set_state(&self, subject: &str, state: &str) {
        let mut scripts = self.scripts.lock();
        let queue = scripts.entry(subject.to_string()).or_default();
        queue.clear();
        queue.push_back(Ok(RawStatusPayload::new(state)));
    }

    pub fn set_pairing(&self, subject: &str, response: Result<String, StatusError>) {
        self.pairing.lock().insert(subject.to_string(), response);
    }

    /// Delay every fetch by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock() = latency;
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn pairing_count(&self) -> usize {
        self.pairings.load(Ordering::SeqCst)
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectionStatusProvider for ScriptedStatusProvider {
    async fn fetch(&self, subject: &str) -> Result<RawStatusPayload, StatusError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        let mut scripts = self.scripts.lock();
        let queue = scripts
            .get_mut(subject)
            .ok_or_else(|| StatusError::Upstream(format!("no session for {}", subject)))?;
        let response = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        response.unwrap_or_else(|| Err(StatusError::Upstream(format!("no session for {}", subject))))
    }

    async fn request_pairing(&self, subject: &str) -> Result<String, StatusError> {
        self.pairings.fetch_add(1, Ordering::SeqCst);
        self.pairing
            .lock()
            .get(subject)
            .cloned()
            .unwrap_or_else(|| Ok(format!("pairing:{}", subject)))
    }

    async fn disconnect(&self, subject: &str) -> Result<(), StatusError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.set_state(subject, "disconnected");
        Ok(())
    }
}
