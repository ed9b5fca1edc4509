//! TTL Cache Service
//!
//! Namespaced key-value cache with per-entry expiry and explicit invalidation,
//! shared by the context resolver and the status poller. Values are
//! type-erased so one service instance can hold contexts and connection
//! statuses side by side; reads downcast back to the caller's type.
//!
//! Concurrent misses for the same `(namespace, key)` are coalesced: the first
//! caller starts the computation and later callers await the same shared
//! future, so one upstream call serves every waiter. Entries are never evicted
//! by size, only by TTL or invalidation.

mod entry;
mod stats;

pub use entry::CacheEntry;
pub use stats::{CacheStats, CacheStatsSnapshot};

use crate::error::CacheError;
use entry::AnyValue;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

type PendingFuture<T, E> = Shared<BoxFuture<'static, Result<T, E>>>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    namespace: String,
    key: String,
}

impl CacheKey {
    fn new(namespace: &str, key: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            key: key.to_string(),
        }
    }
}

/// A computation in flight. `future` holds a `PendingFuture<T, E>`.
struct Pending {
    id: u64,
    future: Box<dyn Any + Send + Sync>,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<CacheKey, CacheEntry>,
    pending: HashMap<CacheKey, Pending>,
    closed: bool,
}

struct Inner {
    state: Mutex<CacheState>,
    stats: CacheStats,
    next_id: AtomicU64,
}

impl Inner {
    /// Finish computation `id`. Its value is stored only while it is still the
    /// registered computation for the key; invalidation, `set` or `clear`
    /// detach it and its result is then handed to waiters but not cached.
    fn complete(&self, key: &CacheKey, id: u64, stored: Option<(AnyValue, Duration)>) {
        let mut state = self.state.lock();
        let registered = state
            .pending
            .get(key)
            .map(|pending| pending.id == id)
            .unwrap_or(false);
        if !registered {
            debug!(
                namespace = %key.namespace,
                key = %key.key,
                "detached computation finished; result not cached"
            );
            return;
        }
        state.pending.remove(key);
        if let Some((value, ttl)) = stored {
            state
                .entries
                .insert(key.clone(), CacheEntry::new(value, ttl, Instant::now()));
            self.stats.record_insert();
        }
    }
}

/// Explicitly constructed cache service.
///
/// Cheap to clone; clones share state. Construct one per process or session
/// and call [`CacheService::shutdown`] when tearing it down.
#[derive(Clone)]
pub struct CacheService {
    inner: Arc<Inner>,
}

impl CacheService {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(CacheState::default()),
                stats: CacheStats::default(),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Return the fresh cached value, or run `compute` and cache its success
    /// for `ttl`. Failures are returned but never cached.
    pub async fn get_or_set<T, E, F, Fut>(
        &self,
        namespace: &str,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        E: From<CacheError> + Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.get_or_set_with(namespace, key, move |_: &T| ttl, compute)
            .await
    }

    /// Like [`CacheService::get_or_set`], with the TTL chosen from the computed value.
    ///
    /// `compute` is called under the cache lock and must only build the future.
    pub async fn get_or_set_with<T, E, F, Fut, P>(
        &self,
        namespace: &str,
        key: &str,
        ttl_for: P,
        compute: F,
    ) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        E: From<CacheError> + Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        P: Fn(&T) -> Duration + Send + 'static,
    {
        let cache_key = CacheKey::new(namespace, key);
        let future: PendingFuture<T, E> = {
            let mut state = self.inner.state.lock();
            if state.closed {
                return Err(CacheError::Closed.into());
            }

            if let Some(entry) = state.entries.get(&cache_key) {
                if !entry.is_expired(Instant::now()) {
                    let value = entry
                        .downcast::<T>()
                        .ok_or_else(|| type_mismatch(&cache_key))?;
                    self.inner.stats.record_hit();
                    debug!(namespace = %namespace, key = %key, "cache hit");
                    return Ok(value);
                }
            }

            if let Some(pending) = state.pending.get(&cache_key) {
                let shared = pending
                    .future
                    .downcast_ref::<PendingFuture<T, E>>()
                    .ok_or_else(|| type_mismatch(&cache_key))?
                    .clone();
                self.inner.stats.record_coalesced();
                debug!(namespace = %namespace, key = %key, "joining in-flight computation");
                shared
            } else {
                self.inner.stats.record_miss();
                debug!(namespace = %namespace, key = %key, "cache miss");

                let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
                let inner = Arc::clone(&self.inner);
                let completion_key = cache_key.clone();
                let work = compute();
                let shared = async move {
                    let result = work.await;
                    let stored = result.as_ref().ok().map(|value| {
                        let ttl = ttl_for(value);
                        (Arc::new(value.clone()) as AnyValue, ttl)
                    });
                    inner.complete(&completion_key, id, stored);
                    result
                }
                .boxed()
                .shared();

                state.pending.insert(
                    cache_key,
                    Pending {
                        id,
                        future: Box::new(shared.clone()),
                    },
                );
                shared
            }
        };

        future.await
    }

    /// Fresh value for the key, if any. Expired and invalidated entries read as `None`.
    pub fn peek<T>(&self, namespace: &str, key: &str) -> Result<Option<T>, CacheError>
    where
        T: Clone + Send + Sync + 'static,
    {
        let cache_key = CacheKey::new(namespace, key);
        let state = self.inner.state.lock();
        if state.closed {
            return Err(CacheError::Closed);
        }
        match state.entries.get(&cache_key) {
            Some(entry) if !entry.is_expired(Instant::now()) => entry
                .downcast::<T>()
                .map(Some)
                .ok_or_else(|| type_mismatch(&cache_key)),
            _ => Ok(None),
        }
    }

    /// Store a value directly, replacing any entry and detaching any
    /// computation in flight for the key.
    pub fn set<T>(&self, namespace: &str, key: &str, value: T, ttl: Duration) -> Result<(), CacheError>
    where
        T: Clone + Send + Sync + 'static,
    {
        let cache_key = CacheKey::new(namespace, key);
        let mut state = self.inner.state.lock();
        if state.closed {
            return Err(CacheError::Closed);
        }
        state.pending.remove(&cache_key);
        state.entries.insert(
            cache_key,
            CacheEntry::new(Arc::new(value), ttl, Instant::now()),
        );
        self.inner.stats.record_insert();
        Ok(())
    }

    /// Invalidate one key, or every key in `namespace` when `key` is `None`.
    ///
    /// Matching in-flight computations are detached so their results are not
    /// cached. Returns the number of entries marked.
    pub fn invalidate(&self, namespace: &str, key: Option<&str>) -> usize {
        let mut state = self.inner.state.lock();
        let mut marked = 0;
        for (cache_key, entry) in state.entries.iter_mut() {
            let matches = cache_key.namespace == namespace
                && key.map(|k| cache_key.key == k).unwrap_or(true);
            if matches && !entry.invalidated {
                entry.invalidated = true;
                marked += 1;
            }
        }
        state.pending.retain(|cache_key, _| {
            !(cache_key.namespace == namespace && key.map(|k| cache_key.key == k).unwrap_or(true))
        });
        self.inner.stats.record_invalidations(marked as u64);
        debug!(namespace = %namespace, key = ?key, marked, "cache invalidated");
        marked
    }

    /// Detach the in-flight computation for a key without touching its entry.
    ///
    /// The next miss starts a fresh computation. Used after a caller gives up
    /// on a computation that appears hung.
    pub fn abandon(&self, namespace: &str, key: &str) -> bool {
        let cache_key = CacheKey::new(namespace, key);
        self.inner.state.lock().pending.remove(&cache_key).is_some()
    }

    /// Whether a computation for the key is in flight.
    pub fn is_pending(&self, namespace: &str, key: &str) -> bool {
        let cache_key = CacheKey::new(namespace, key);
        self.inner.state.lock().pending.contains_key(&cache_key)
    }

    /// Time until the key's entry expires; `None` when it is absent or stale.
    pub fn remaining_ttl(&self, namespace: &str, key: &str) -> Option<Duration> {
        let cache_key = CacheKey::new(namespace, key);
        let now = Instant::now();
        self.inner
            .state
            .lock()
            .entries
            .get(&cache_key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.remaining(now))
    }

    /// Drop every entry in every namespace.
    pub fn clear(&self) {
        let mut state = self.inner.state.lock();
        state.entries.clear();
        state.pending.clear();
    }

    /// Remove expired entries. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut state = self.inner.state.lock();
        let before = state.entries.len();
        state.entries.retain(|_, entry| !entry.is_expired(now));
        before - state.entries.len()
    }

    /// Clear all state and refuse further use.
    pub fn shutdown(&self) {
        let mut state = self.inner.state.lock();
        state.entries.clear();
        state.pending.clear();
        state.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.inner.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.inner.stats.snapshot()
    }
}

impl Default for CacheService {
    fn default() -> Self {
        Self::new()
    }
}

fn type_mismatch(key: &CacheKey) -> CacheError {
    CacheError::TypeMismatch {
        namespace: key.namespace.clone(),
        key: key.key.clone(),
    }
}
