//! JSON fixtures of profiles and delegate records.

use crate::error::StoreError;
use crate::identity::{DelegateRecord, Profile};
use crate::store::{DelegateStore, ProfileStore};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// A set of records to seed stores with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub profiles: Vec<Profile>,
    #[serde(default)]
    pub delegates: Vec<DelegateRecord>,
}

/// Counts from an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub profiles: usize,
    pub delegates: usize,
}

impl Fixture {
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        let fixture: Fixture = serde_json::from_str(json)?;
        fixture.validate()?;
        Ok(fixture)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Ids must be unique, and a principal is either an owner or a delegate.
    pub fn validate(&self) -> Result<(), StoreError> {
        let mut profile_ids = HashSet::new();
        for profile in &self.profiles {
            if !profile_ids.insert(profile.id.as_str()) {
                return Err(StoreError::Serialization(format!(
                    "duplicate profile id '{}'",
                    profile.id
                )));
            }
        }
        let mut delegate_ids = HashSet::new();
        for delegate in &self.delegates {
            if !delegate_ids.insert(delegate.id.as_str()) {
                return Err(StoreError::Serialization(format!(
                    "duplicate delegate id '{}'",
                    delegate.id
                )));
            }
            if profile_ids.contains(delegate.id.as_str()) {
                return Err(StoreError::Serialization(format!(
                    "'{}' is both a profile and a delegate",
                    delegate.id
                )));
            }
        }
        Ok(())
    }

    /// Write every record into the stores, overwriting existing ones.
    pub async fn import_into(
        &self,
        profiles: &dyn ProfileStore,
        delegates: &dyn DelegateStore,
    ) -> Result<ImportSummary, StoreError> {
        for profile in &self.profiles {
            profiles.put(profile).await?;
        }
        for record in &self.delegates {
            delegates.put(record).await?;
        }
        Ok(ImportSummary {
            profiles: self.profiles.len(),
            delegates: self.delegates.len(),
        })
    }
}
