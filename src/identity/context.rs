//! The unified context a principal resolves to.

use super::{DelegateRecord, PermissionSet, Profile};
use crate::error::ResolutionError;
use crate::types::now_millis;
use serde::{Deserialize, Serialize};

/// Whether the principal is the account holder or acts on their behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalKind {
    Owner,
    Delegate,
}

impl PrincipalKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PrincipalKind::Owner => "owner",
            PrincipalKind::Delegate => "delegate",
        }
    }
}

/// Resolved identity of a principal.
///
/// Immutable once built: a new resolution yields a new value. Owners always
/// carry [`PermissionSet::Full`]; only delegates carry a delegate record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnifiedContext {
    principal_id: String,
    principal_kind: PrincipalKind,
    effective_owner_id: String,
    owner_profile: Profile,
    delegate_record: Option<DelegateRecord>,
    permissions: PermissionSet,
    resolved_at_ms: u64,
}

impl UnifiedContext {
    /// Context of an account holder acting on their own data.
    pub fn owner(profile: Profile) -> Self {
        Self {
            principal_id: profile.id.clone(),
            principal_kind: PrincipalKind::Owner,
            effective_owner_id: profile.id.clone(),
            owner_profile: profile,
            delegate_record: None,
            permissions: PermissionSet::Full,
            resolved_at_ms: now_millis(),
        }
    }

    /// Context of a delegate acting on `owner_profile`'s data.
    pub fn delegate(record: DelegateRecord, owner_profile: Profile) -> Result<Self, ResolutionError> {
        if record.owner_id != owner_profile.id {
            return Err(ResolutionError::Validation(format!(
                "delegate {} points at owner {} but profile {} was loaded",
                record.id, record.owner_id, owner_profile.id
            )));
        }
        Ok(Self {
            principal_id: record.id.clone(),
            principal_kind: PrincipalKind::Delegate,
            effective_owner_id: owner_profile.id.clone(),
            permissions: record.permissions.clone(),
            owner_profile,
            delegate_record: Some(record),
            resolved_at_ms: now_millis(),
        })
    }

    pub fn principal_id(&self) -> &str {
        &self.principal_id
    }

    pub fn principal_kind(&self) -> PrincipalKind {
        self.principal_kind
    }

    pub fn is_owner(&self) -> bool {
        self.principal_kind == PrincipalKind::Owner
    }

    /// Id whose data scope applies to everything the principal does.
    pub fn effective_owner_id(&self) -> &str {
        &self.effective_owner_id
    }

    pub fn owner_profile(&self) -> &Profile {
        &self.owner_profile
    }

    pub fn delegate_record(&self) -> Option<&DelegateRecord> {
        self.delegate_record.as_ref()
    }

    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    pub fn resolved_at_ms(&self) -> u64 {
        self.resolved_at_ms
    }
}
