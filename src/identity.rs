//! Identity Model
//!
//! Profiles, delegate records and the unified context a principal resolves to.
//! An account holder (owner) acts on their own data; a delegate acts on an
//! owner's data under the permissions the owner granted.

mod claims;
mod context;
mod delegate;
mod profile;

pub use claims::AuthClaims;
pub use context::{PrincipalKind, UnifiedContext};
pub use delegate::{DelegateRecord, PermissionMap, PermissionSet};
pub use profile::{LegacyAccess, PlanFlags, Profile, ProfileUpdate};
