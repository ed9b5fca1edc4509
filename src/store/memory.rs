//! In-memory stores with call counters and fault injection.

use crate::error::StoreError;
use crate::identity::{DelegateRecord, PermissionSet, Profile, ProfileUpdate};
use crate::store::{DelegateStore, ProfileStore};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Failure and latency injected into a store's calls.
#[derive(Debug, Default)]
struct FaultPlan {
    fail_next: usize,
    fail_always: bool,
    latency: Option<Duration>,
}

impl FaultPlan {
    /// Returns the latency to apply and whether this call should fail.
    fn next_call(&mut self) -> (Option<Duration>, bool) {
        let fail = if self.fail_always {
            true
        } else if self.fail_next > 0 {
            self.fail_next -= 1;
            true
        } else {
            false
        };
        (self.latency, fail)
    }
}

async fn apply_faults(plan: &Mutex<FaultPlan>, op: &str) -> Result<(), StoreError> {
    let (latency, fail) = plan.lock().next_call();
    if let Some(latency) = latency {
        tokio::time::sleep(latency).await;
    }
    if fail {
        return Err(StoreError::Unavailable(format!("injected failure in {}", op)));
    }
    Ok(())
}

/// Call counts observed by a memory store.
#[derive(Debug, Default)]
struct CallCounters {
    gets: AtomicUsize,
    creates: AtomicUsize,
    writes: AtomicUsize,
}

/// Profile store backed by a map.
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    profiles: RwLock<HashMap<String, Profile>>,
    faults: Mutex<FaultPlan>,
    calls: CallCounters,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profiles(profiles: impl IntoIterator<Item = Profile>) -> Self {
        let store = Self::new();
        {
            let mut map = store.profiles.write();
            for profile in profiles {
                map.insert(profile.id.clone(), profile);
            }
        }
        store
    }

    /// Fail the next `n` calls with [`StoreError::Unavailable`].
    pub fn fail_next(&self, n: usize) {
        self.faults.lock().fail_next = n;
    }

    pub fn fail_always(&self, fail: bool) {
        self.faults.lock().fail_always = fail;
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.faults.lock().latency = latency;
    }

    pub fn get_calls(&self) -> usize {
        self.calls.gets.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.calls.creates.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.profiles.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get(&self, id: &str) -> Result<Option<Profile>, StoreError> {
        self.calls.gets.fetch_add(1, Ordering::SeqCst);
        apply_faults(&self.faults, "profile get").await?;
        Ok(self.profiles.read().get(id).cloned())
    }

    async fn create(&self, profile: &Profile) -> Result<(), StoreError> {
        self.calls.creates.fetch_add(1, Ordering::SeqCst);
        apply_faults(&self.faults, "profile create").await?;
        let mut profiles = self.profiles.write();
        if profiles.contains_key(&profile.id) {
            return Err(StoreError::AlreadyExists(profile.id.clone()));
        }
        profiles.insert(profile.id.clone(), profile.clone());
        Ok(())
    }

    async fn put(&self, profile: &Profile) -> Result<(), StoreError> {
        self.calls.writes.fetch_add(1, Ordering::SeqCst);
        apply_faults(&self.faults, "profile put").await?;
        self.profiles
            .write()
            .insert(profile.id.clone(), profile.clone());
        Ok(())
    }

    async fn update(&self, id: &str, update: &ProfileUpdate) -> Result<Profile, StoreError> {
        self.calls.writes.fetch_add(1, Ordering::SeqCst);
        apply_faults(&self.faults, "profile update").await?;
        let mut profiles = self.profiles.write();
        let profile = profiles
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        update.apply(profile);
        Ok(profile.clone())
    }
}

/// Delegate store backed by a map.
#[derive(Debug, Default)]
pub struct MemoryDelegateStore {
    delegates: RwLock<HashMap<String, DelegateRecord>>,
    faults: Mutex<FaultPlan>,
    touch_faults: Mutex<FaultPlan>,
    calls: CallCounters,
    touches: AtomicUsize,
}

impl MemoryDelegateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delegates(records: impl IntoIterator<Item = DelegateRecord>) -> Self {
        let store = Self::new();
        {
            let mut map = store.delegates.write();
            for record in records {
                map.insert(record.id.clone(), record);
            }
        }
        store
    }

    pub fn fail_next(&self, n: usize) {
        self.faults.lock().fail_next = n;
    }

    pub fn fail_always(&self, fail: bool) {
        self.faults.lock().fail_always = fail;
    }

    pub fn set_latency(&self, latency: Option<Duration>) {
        self.faults.lock().latency = latency;
    }

    /// Make `touch_login` fail without affecting reads.
    pub fn fail_touch_login(&self, fail: bool) {
        self.touch_faults.lock().fail_always = fail;
    }

    pub fn get_calls(&self) -> usize {
        self.calls.gets.load(Ordering::SeqCst)
    }

    pub fn touch_calls(&self) -> usize {
        self.touches.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self, id: &str) -> Option<DelegateRecord> {
        self.delegates.read().get(id).cloned()
    }

    fn modify<F>(&self, id: &str, f: F) -> Result<DelegateRecord, StoreError>
    where
        F: FnOnce(&mut DelegateRecord),
    {
        let mut delegates = self.delegates.write();
        let record = delegates
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        f(record);
        Ok(record.clone())
    }
}

#[async_trait]
impl DelegateStore for MemoryDelegateStore {
    async fn get(&self, id: &str) -> Result<Option<DelegateRecord>, StoreError> {
        self.calls.gets.fetch_add(1, Ordering::SeqCst);
        apply_faults(&self.faults, "delegate get").await?;
        Ok(self.delegates.read().get(id).cloned())
    }

    async fn put(&self, record: &DelegateRecord) -> Result<(), StoreError> {
        self.calls.writes.fetch_add(1, Ordering::SeqCst);
        apply_faults(&self.faults, "delegate put").await?;
        self.delegates
            .write()
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn touch_login(&self, id: &str) -> Result<(), StoreError> {
        self.touches.fetch_add(1, Ordering::SeqCst);
        apply_faults(&self.touch_faults, "delegate touch_login").await?;
        self.modify(id, |record| record.record_login(Utc::now()))
            .map(|_| ())
    }

    async fn set_permissions(
        &self,
        id: &str,
        permissions: PermissionSet,
    ) -> Result<DelegateRecord, StoreError> {
        self.calls.writes.fetch_add(1, Ordering::SeqCst);
        apply_faults(&self.faults, "delegate set_permissions").await?;
        self.modify(id, |record| record.permissions = permissions)
    }

    async fn set_active(&self, id: &str, active: bool) -> Result<DelegateRecord, StoreError> {
        self.calls.writes.fetch_add(1, Ordering::SeqCst);
        apply_faults(&self.faults, "delegate set_active").await?;
        self.modify(id, |record| record.active = active)
    }
}
