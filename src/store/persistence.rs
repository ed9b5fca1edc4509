//! Persistence layer for profile and delegate stores

use crate::error::StoreError;
use crate::identity::{DelegateRecord, PermissionSet, Profile, ProfileUpdate};
use crate::store::{DelegateStore, ProfileStore};
use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

const PROFILES_TREE: &str = "profiles";
const DELEGATES_TREE: &str = "delegates";

/// Open (or create) the sled database shared by both stores.
pub fn open_db<P: AsRef<Path>>(path: P) -> Result<sled::Db, StoreError> {
    sled::open(path).map_err(|e| {
        StoreError::IoError(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("Failed to open sled database: {}", e),
        ))
    })
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(value).map_err(StoreError::from)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
    serde_json::from_slice(bytes).map_err(StoreError::from)
}

fn read<T: DeserializeOwned>(tree: &sled::Tree, id: &str) -> Result<Option<T>, StoreError> {
    match tree.get(id.as_bytes())? {
        Some(value) => Ok(Some(decode(&value)?)),
        None => Ok(None),
    }
}

/// Read-modify-write under compare-and-swap, retrying on concurrent writers.
fn modify<T, F>(tree: &sled::Tree, id: &str, mut f: F) -> Result<T, StoreError>
where
    T: Serialize + DeserializeOwned,
    F: FnMut(&mut T),
{
    loop {
        let current = tree
            .get(id.as_bytes())?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let mut value: T = decode(&current)?;
        f(&mut value);
        let updated = encode(&value)?;
        match tree.compare_and_swap(id.as_bytes(), Some(current), Some(updated))? {
            Ok(()) => return Ok(value),
            Err(_) => continue,
        }
    }
}

/// Sled-based implementation of ProfileStore
pub struct SledProfileStore {
    tree: sled::Tree,
}

impl SledProfileStore {
    pub fn new(db: &sled::Db) -> Result<Self, StoreError> {
        Ok(Self {
            tree: db.open_tree(PROFILES_TREE)?,
        })
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}

#[async_trait]
impl ProfileStore for SledProfileStore {
    async fn get(&self, id: &str) -> Result<Option<Profile>, StoreError> {
        read(&self.tree, id)
    }

    async fn create(&self, profile: &Profile) -> Result<(), StoreError> {
        let bytes = encode(profile)?;
        match self
            .tree
            .compare_and_swap(profile.id.as_bytes(), None as Option<&[u8]>, Some(bytes))?
        {
            Ok(()) => {
                self.tree.flush()?;
                Ok(())
            }
            Err(_) => Err(StoreError::AlreadyExists(profile.id.clone())),
        }
    }

    async fn put(&self, profile: &Profile) -> Result<(), StoreError> {
        self.tree.insert(profile.id.as_bytes(), encode(profile)?)?;
        self.tree.flush()?;
        Ok(())
    }

    async fn update(&self, id: &str, update: &ProfileUpdate) -> Result<Profile, StoreError> {
        let profile = modify(&self.tree, id, |profile: &mut Profile| update.apply(profile))?;
        self.tree.flush()?;
        Ok(profile)
    }
}

/// Sled-based implementation of DelegateStore
pub struct SledDelegateStore {
    tree: sled::Tree,
}

impl SledDelegateStore {
    pub fn new(db: &sled::Db) -> Result<Self, StoreError> {
        Ok(Self {
            tree: db.open_tree(DELEGATES_TREE)?,
        })
    }

    fn modify_and_flush<F>(&self, id: &str, f: F) -> Result<DelegateRecord, StoreError>
    where
        F: FnMut(&mut DelegateRecord),
    {
        let record = modify(&self.tree, id, f)?;
        self.tree.flush()?;
        Ok(record)
    }
}

#[async_trait]
impl DelegateStore for SledDelegateStore {
    async fn get(&self, id: &str) -> Result<Option<DelegateRecord>, StoreError> {
        read(&self.tree, id)
    }

    async fn put(&self, record: &DelegateRecord) -> Result<(), StoreError> {
        self.tree.insert(record.id.as_bytes(), encode(record)?)?;
        self.tree.flush()?;
        Ok(())
    }

    async fn touch_login(&self, id: &str) -> Result<(), StoreError> {
        let now = Utc::now();
        self.modify_and_flush(id, |record| record.record_login(now))
            .map(|_| ())
    }

    async fn set_permissions(
        &self,
        id: &str,
        permissions: PermissionSet,
    ) -> Result<DelegateRecord, StoreError> {
        self.modify_and_flush(id, |record| record.permissions = permissions.clone())
    }

    async fn set_active(&self, id: &str, active: bool) -> Result<DelegateRecord, StoreError> {
        self.modify_and_flush(id, |record| record.active = active)
    }
}
