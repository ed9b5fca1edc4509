//! Shared builders for integration tests.

use practice_context::cache::CacheService;
use practice_context::identity::{DelegateRecord, PermissionSet, Profile};
use practice_context::resolver::{ContextResolver, ResolverPolicy};
use practice_context::store::{MemoryDelegateStore, MemoryProfileStore};
use std::sync::Arc;

/// Owner with an email and a free-tier plan: valid data and access.
pub fn owner(id: &str) -> Profile {
    let mut profile = Profile::new(id, format!("Owner {}", id));
    profile.email = Some(format!("{}@clinic.test", id));
    profile.plan.free_tier = true;
    profile
}

pub fn delegate(id: &str, owner_id: &str, permissions: PermissionSet) -> DelegateRecord {
    DelegateRecord::new(id, owner_id, permissions)
}

/// Resolver over in-memory stores, with handles to the stores for fault
/// injection and call counting.
pub struct Harness {
    pub resolver: Arc<ContextResolver>,
    pub profiles: Arc<MemoryProfileStore>,
    pub delegates: Arc<MemoryDelegateStore>,
    pub cache: CacheService,
}

impl Harness {
    pub fn new(
        profiles: impl IntoIterator<Item = Profile>,
        delegates: impl IntoIterator<Item = DelegateRecord>,
    ) -> Self {
        let profiles = Arc::new(MemoryProfileStore::with_profiles(profiles));
        let delegates = Arc::new(MemoryDelegateStore::with_delegates(delegates));
        let cache = CacheService::new();
        let resolver = Arc::new(ContextResolver::new(
            cache.clone(),
            profiles.clone(),
            delegates.clone(),
            ResolverPolicy::default(),
        ));
        Self {
            resolver,
            profiles,
            delegates,
            cache,
        }
    }
}
