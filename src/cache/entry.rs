//! Cache entries and their expiry rule.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Type-erased cached value shared between readers.
pub(crate) type AnyValue = Arc<dyn Any + Send + Sync>;

/// A stored value with the metadata that decides its freshness.
#[derive(Clone)]
pub struct CacheEntry {
    pub(crate) value: AnyValue,
    /// When the value was stored
    pub stored_at: Instant,
    /// How long the value stays fresh
    pub ttl: Duration,
    /// Set by explicit invalidation; never cleared, the entry is replaced instead
    pub invalidated: bool,
}

impl CacheEntry {
    pub(crate) fn new(value: AnyValue, ttl: Duration, now: Instant) -> Self {
        Self {
            value,
            stored_at: now,
            ttl,
            invalidated: false,
        }
    }

    /// An entry is expired once its TTL has elapsed or it was invalidated.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.invalidated || now.saturating_duration_since(self.stored_at) >= self.ttl
    }

    /// Freshness left at `now`; zero once the TTL has elapsed.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.ttl
            .saturating_sub(now.saturating_duration_since(self.stored_at))
    }

    /// Clone the value out if it holds a `T`.
    pub(crate) fn downcast<T>(&self) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.value.downcast_ref::<T>().cloned()
    }
}

impl std::fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEntry")
            .field("stored_at", &self.stored_at)
            .field("ttl", &self.ttl)
            .field("invalidated", &self.invalidated)
            .finish_non_exhaustive()
    }
}
