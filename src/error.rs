//! Error types for identity resolution, caching and status polling.

use std::time::Duration;
use thiserror::Error;

/// Collaborator store errors (profile and delegate stores).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Record already exists: {0}")]
    AlreadyExists(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Store I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        StoreError::Unavailable(format!("sled: {}", err))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Cache service errors
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("Cached value under {namespace}/{key} has an unexpected type")]
    TypeMismatch { namespace: String, key: String },

    #[error("Cache service has been shut down")]
    Closed,
}

/// Failure to turn a principal id into a [`UnifiedContext`](crate::identity::UnifiedContext).
///
/// Cloneable so one coalesced upstream computation can hand the same failure
/// to every waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("No profile or delegate record for principal {0}")]
    NotFound(String),

    #[error("Delegate access for principal {0} has been deactivated")]
    Deactivated(String),

    #[error("Context resolution timed out after {0:?}")]
    Timeout(Duration),

    #[error("Upstream store failed: {0}")]
    Upstream(String),

    #[error("Malformed identity data: {0}")]
    Validation(String),
}

impl ResolutionError {
    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ResolutionError::Timeout(_) | ResolutionError::Upstream(_))
    }

    /// Failures that mean the principal must not be let in.
    pub fn is_authorization(&self) -> bool {
        matches!(
            self,
            ResolutionError::NotFound(_) | ResolutionError::Deactivated(_)
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ResolutionError::NotFound(_) => "not_found",
            ResolutionError::Deactivated(_) => "deactivated",
            ResolutionError::Timeout(_) => "timeout",
            ResolutionError::Upstream(_) => "upstream",
            ResolutionError::Validation(_) => "validation",
        }
    }
}

impl From<StoreError> for ResolutionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ResolutionError::NotFound(id),
            StoreError::Serialization(msg) => ResolutionError::Validation(msg),
            other => ResolutionError::Upstream(other.to_string()),
        }
    }
}

impl From<CacheError> for ResolutionError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::TypeMismatch { .. } => ResolutionError::Validation(err.to_string()),
            CacheError::Closed => ResolutionError::Upstream(err.to_string()),
        }
    }
}

/// Connection status poller errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatusError {
    #[error("Status provider failed: {0}")]
    Upstream(String),

    #[error("Malformed status payload: {0}")]
    Validation(String),

    #[error("Status provider not configured: {0}")]
    NotConfigured(String),
}

impl From<CacheError> for StatusError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::TypeMismatch { .. } => StatusError::Validation(err.to_string()),
            CacheError::Closed => StatusError::Upstream(err.to_string()),
        }
    }
}

/// Top-level errors surfaced by the CLI and configuration layers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Resolution failed: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("Status check failed: {0}")]
    Status(#[from] StatusError),

    #[error("Storage error: {0}")]
    StorageError(#[from] StoreError),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
