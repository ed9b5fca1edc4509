//! Profile and Delegate Stores
//!
//! Ports to the hosted data store that owns profiles and delegate records.
//! Resolution only reads through these; mutations go through the resolver's
//! helpers so cached contexts are invalidated alongside the write.

pub mod fixture;
pub mod memory;
pub mod persistence;

pub use fixture::{Fixture, ImportSummary};
pub use memory::{MemoryDelegateStore, MemoryProfileStore};
pub use persistence::{SledDelegateStore, SledProfileStore};

use crate::error::StoreError;
use crate::identity::{DelegateRecord, PermissionSet, Profile, ProfileUpdate};
use async_trait::async_trait;

/// Profile store interface
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Profile>, StoreError>;

    /// Create a profile. Fails with [`StoreError::AlreadyExists`] when a
    /// profile with the same id is present; never creates a duplicate.
    async fn create(&self, profile: &Profile) -> Result<(), StoreError>;

    /// Insert or overwrite a profile.
    async fn put(&self, profile: &Profile) -> Result<(), StoreError>;

    /// Apply a partial update and return the updated profile.
    async fn update(&self, id: &str, update: &ProfileUpdate) -> Result<Profile, StoreError>;
}

/// Delegate store interface
#[async_trait]
pub trait DelegateStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<DelegateRecord>, StoreError>;

    /// Insert or overwrite a delegate record.
    async fn put(&self, record: &DelegateRecord) -> Result<(), StoreError>;

    /// Bump login counters for a delegate.
    async fn touch_login(&self, id: &str) -> Result<(), StoreError>;

    async fn set_permissions(
        &self,
        id: &str,
        permissions: PermissionSet,
    ) -> Result<DelegateRecord, StoreError>;

    async fn set_active(&self, id: &str, active: bool) -> Result<DelegateRecord, StoreError>;

    /// Whether a delegate record exists and is active.
    async fn is_active(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.get(id).await?.map(|r| r.active).unwrap_or(false))
    }
}
