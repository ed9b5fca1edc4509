//! Account holder profiles.

use super::AuthClaims;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A principal's own record. Owned by the profile store; never mutated by
/// resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub plan: PlanFlags,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Plan and feature flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanFlags {
    #[serde(default)]
    pub plan_name: Option<String>,
    #[serde(default)]
    pub paid: bool,
    #[serde(default)]
    pub free_tier: bool,
    #[serde(default)]
    pub trial_started_at: Option<DateTime<Utc>>,
    /// Per-module feature flags of the current plan model
    #[serde(default)]
    pub modules: BTreeSet<String>,
    #[serde(default)]
    pub legacy: LegacyAccess,
}

/// Access flags from before the plan/module model existed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyAccess {
    #[serde(default)]
    pub subscription_active: bool,
    #[serde(default)]
    pub lifetime_access: bool,
}

impl LegacyAccess {
    pub fn any(&self) -> bool {
        self.subscription_active || self.lifetime_access
    }
}

impl PlanFlags {
    /// Whether any flag of the current plan/module model is set.
    pub fn has_current_flags(&self) -> bool {
        self.plan_name.is_some()
            || self.paid
            || self.free_tier
            || self.trial_started_at.is_some()
            || !self.modules.is_empty()
    }

    /// Plan or trial markers, old or new.
    pub fn has_markers(&self) -> bool {
        self.has_current_flags() || self.legacy.any()
    }
}

impl Profile {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            email: None,
            phone: None,
            email_verified: false,
            is_admin: false,
            plan: PlanFlags::default(),
            created_at: None,
            updated_at: None,
        }
    }

    /// Minimal profile for an authenticated principal with no records.
    pub fn bootstrap(claims: &AuthClaims) -> Self {
        let now = Utc::now();
        Self {
            id: claims.principal_id.clone(),
            display_name: claims.preferred_name(),
            email: claims.email.clone().filter(|e| !e.trim().is_empty()),
            phone: None,
            email_verified: claims.email_verified,
            is_admin: false,
            plan: PlanFlags::default(),
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    pub fn has_email(&self) -> bool {
        self.email
            .as_deref()
            .map(|e| !e.trim().is_empty())
            .unwrap_or(false)
    }

    /// Enough data to use the app: an email and some plan or trial marker.
    pub fn has_valid_data(&self) -> bool {
        self.has_email() && self.plan.has_markers()
    }

    /// Pre-migration account: old-style access flags and none of the new ones.
    pub fn is_legacy_grandfathered(&self) -> bool {
        self.plan.legacy.any() && !self.plan.has_current_flags()
    }

    /// Whether the account holds an active access grant.
    pub fn has_access(&self) -> bool {
        self.plan.paid || self.plan.free_tier || self.is_admin || self.is_legacy_grandfathered()
    }
}

/// Partial profile update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email_verified: Option<bool>,
    #[serde(default)]
    pub is_admin: Option<bool>,
    #[serde(default)]
    pub plan: Option<PlanFlags>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self == &ProfileUpdate::default()
    }

    pub fn apply(&self, profile: &mut Profile) {
        if let Some(name) = &self.display_name {
            profile.display_name = name.clone();
        }
        if let Some(email) = &self.email {
            profile.email = Some(email.clone());
        }
        if let Some(phone) = &self.phone {
            profile.phone = Some(phone.clone());
        }
        if let Some(verified) = self.email_verified {
            profile.email_verified = verified;
        }
        if let Some(is_admin) = self.is_admin {
            profile.is_admin = is_admin;
        }
        if let Some(plan) = &self.plan {
            profile.plan = plan.clone();
        }
        profile.updated_at = Some(Utc::now());
    }
}
