//! Shared identifiers and cache namespaces.

use std::time::{SystemTime, UNIX_EPOCH};

/// Id of an authenticated principal (account holder or delegate).
pub type PrincipalId = String;

/// Id of the subject a connection status belongs to.
pub type SubjectId = String;

/// Cache namespace holding resolved contexts, keyed by principal id.
pub const CONTEXT_NAMESPACE: &str = "context";

/// Cache namespace holding connection statuses, keyed by subject id.
pub const STATUS_NAMESPACE: &str = "conn-status";

/// Current time as milliseconds since Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
