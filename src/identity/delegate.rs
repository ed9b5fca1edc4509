//! Delegate records and granted permissions.

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// module -> action -> allowed
pub type PermissionMap = BTreeMap<String, BTreeMap<String, bool>>;

/// Permissions granted to a delegate: everything, or an explicit map.
///
/// Serialized as the literal string `"full"` or as the map itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionSet {
    Full,
    Map(PermissionMap),
}

impl PermissionSet {
    pub fn is_full(&self) -> bool {
        matches!(self, PermissionSet::Full)
    }

    /// `Full` allows everything; a map allows only what it lists as `true`.
    pub fn allows(&self, module: &str, action: &str) -> bool {
        match self {
            PermissionSet::Full => true,
            PermissionSet::Map(map) => map
                .get(module)
                .and_then(|actions| actions.get(action))
                .copied()
                .unwrap_or(false),
        }
    }

    pub fn empty() -> Self {
        PermissionSet::Map(PermissionMap::new())
    }

    /// Builder helper: grant `actions` on `module`.
    pub fn grant(mut self, module: &str, actions: &[&str]) -> Self {
        if let PermissionSet::Map(map) = &mut self {
            let entry = map.entry(module.to_string()).or_default();
            for action in actions {
                entry.insert(action.to_string(), true);
            }
        }
        self
    }
}

impl Default for PermissionSet {
    fn default() -> Self {
        PermissionSet::empty()
    }
}

impl Serialize for PermissionSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PermissionSet::Full => serializer.serialize_str("full"),
            PermissionSet::Map(map) => map.serialize(serializer),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PermissionRepr {
    Literal(String),
    Map(PermissionMap),
}

impl<'de> Deserialize<'de> for PermissionSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match PermissionRepr::deserialize(deserializer)? {
            PermissionRepr::Literal(s) if s == "full" => Ok(PermissionSet::Full),
            PermissionRepr::Literal(s) => Err(D::Error::custom(format!(
                "unknown permission literal '{}' (expected \"full\" or a module map)",
                s
            ))),
            PermissionRepr::Map(map) => Ok(PermissionSet::Map(map)),
        }
    }
}

/// Links a delegate principal to the owner whose data it acts on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegateRecord {
    pub id: String,
    pub owner_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub active: bool,
    #[serde(default)]
    pub permissions: PermissionSet,
    #[serde(default)]
    pub login_count: u64,
    #[serde(default)]
    pub last_login_at: Option<DateTime<Utc>>,
}

impl DelegateRecord {
    pub fn new(id: impl Into<String>, owner_id: impl Into<String>, permissions: PermissionSet) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            display_name: None,
            active: true,
            permissions,
            login_count: 0,
            last_login_at: None,
        }
    }

    /// Bump login counters.
    pub fn record_login(&mut self, at: DateTime<Utc>) {
        self.login_count += 1;
        self.last_login_at = Some(at);
    }
}
