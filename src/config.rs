//! Configuration System
//!
//! Layered configuration for cache lifetimes, resolver retry policy, route
//! table, status poller intervals, storage and logging. Sources are merged
//! with the `config` crate; every field has a default so an empty source set
//! yields a usable configuration.

use crate::access::RouteConfig;
use crate::logging::LoggingConfig;
use crate::resolver::ResolverConfig;
use crate::status::PollerConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextConfig {
    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub routes: RouteConfig,

    #[serde(default)]
    pub poller: PollerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Lifetimes of cached contexts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// TTL of a context resolved without force
    #[serde(default = "default_context_ttl_secs")]
    pub context_ttl_secs: u64,

    /// TTL of a context resolved with force
    #[serde(default = "default_forced_ttl_secs")]
    pub forced_ttl_secs: u64,
}

fn default_context_ttl_secs() -> u64 {
    300
}

fn default_forced_ttl_secs() -> u64 {
    1
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            context_ttl_secs: default_context_ttl_secs(),
            forced_ttl_secs: default_forced_ttl_secs(),
        }
    }
}

impl CacheConfig {
    pub fn context_ttl(&self) -> Duration {
        Duration::from_secs(self.context_ttl_secs)
    }

    pub fn forced_ttl(&self) -> Duration {
        Duration::from_secs(self.forced_ttl_secs)
    }
}

/// Storage paths
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// sled database directory; the platform data dir when unset
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    pub fn resolve_path(&self) -> PathBuf {
        if let Some(path) = &self.path {
            return path.clone();
        }
        directories::ProjectDirs::from("", "", "practice-context")
            .map(|dirs| dirs.data_dir().join("store"))
            .unwrap_or_else(|| PathBuf::from(".practice-context/store"))
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Cache(String),
    Resolver(String),
    Routes(String),
    Poller(String),
    Storage(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Cache(msg) => write!(f, "Cache: {}", msg),
            ValidationError::Resolver(msg) => write!(f, "Resolver: {}", msg),
            ValidationError::Routes(msg) => write!(f, "Routes: {}", msg),
            ValidationError::Poller(msg) => write!(f, "Poller: {}", msg),
            ValidationError::Storage(msg) => write!(f, "Storage: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl ContextConfig {
    /// Validate the entire configuration, collecting every problem found.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.cache.context_ttl_secs == 0 {
            errors.push(ValidationError::Cache(
                "context_ttl_secs must be greater than zero".to_string(),
            ));
        }
        if self.cache.forced_ttl_secs == 0 {
            errors.push(ValidationError::Cache(
                "forced_ttl_secs must be greater than zero".to_string(),
            ));
        }

        if self.resolver.max_attempts == 0 {
            errors.push(ValidationError::Resolver(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.resolver.attempt_timeout_secs == 0 {
            errors.push(ValidationError::Resolver(
                "attempt_timeout_secs must be greater than zero".to_string(),
            ));
        }

        for (name, path) in self.routes.named_paths() {
            if !path.starts_with('/') {
                errors.push(ValidationError::Routes(format!(
                    "{} '{}' must start with '/'",
                    name, path
                )));
            }
        }
        if self.routes.public_entries.is_empty() {
            errors.push(ValidationError::Routes(
                "public_entries must not be empty".to_string(),
            ));
        }

        for (name, secs) in [
            ("connected_secs", self.poller.connected_secs),
            ("disconnected_secs", self.poller.disconnected_secs),
            ("error_secs", self.poller.error_secs),
            ("transitional_secs", self.poller.transitional_secs),
        ] {
            if secs == 0 {
                errors.push(ValidationError::Poller(format!(
                    "{} must be greater than zero",
                    name
                )));
            }
        }
        if self.poller.transitional_secs > self.poller.connected_secs {
            errors.push(ValidationError::Poller(
                "transitional_secs must not exceed connected_secs".to_string(),
            ));
        }
        if let Some(endpoint) = &self.poller.endpoint {
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                errors.push(ValidationError::Poller(format!(
                    "endpoint '{}' must be an http(s) URL",
                    endpoint
                )));
            }
        }

        if let Some(path) = &self.storage.path {
            if path.as_os_str().is_empty() {
                errors.push(ValidationError::Storage("path must not be empty".to_string()));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
