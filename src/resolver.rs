//! Context Resolver
//!
//! Turns a principal id into a [`UnifiedContext`]: the principal's own profile
//! when they are an account holder, or the owner's profile plus the delegate
//! record when they act on someone else's behalf. Results are cached per
//! principal in the `context` namespace of a shared [`CacheService`].
//!
//! [`ContextResolver::resolve`] is a side-effect-free read apart from the
//! fire-and-forget login bookkeeping for delegates. Creating a profile for an
//! authenticated principal with no records is the separate, explicit
//! [`ContextResolver::ensure_profile`] step.

mod bootstrap;
mod retry;

pub use retry::{retry_with_backoff, RetryPolicy};

use crate::cache::CacheService;
use crate::config::CacheConfig;
use crate::error::{ResolutionError, StoreError};
use crate::identity::{AuthClaims, DelegateRecord, PermissionSet, Profile, ProfileUpdate, UnifiedContext};
use crate::store::{DelegateStore, ProfileStore};
use crate::types::CONTEXT_NAMESPACE;
use bootstrap::KeyedLocks;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Retry policy for context resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,

    /// Backoff after attempt `n` is `n * backoff_step_ms`
    #[serde(default = "default_backoff_step_ms")]
    pub backoff_step_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_attempt_timeout_secs() -> u64 {
    15
}

fn default_backoff_step_ms() -> u64 {
    1000
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            attempt_timeout_secs: default_attempt_timeout_secs(),
            backoff_step_ms: default_backoff_step_ms(),
        }
    }
}

impl ResolverConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            attempt_timeout: Duration::from_secs(self.attempt_timeout_secs),
            backoff_step: Duration::from_millis(self.backoff_step_ms),
        }
    }
}

/// Lifetimes and retry policy the resolver runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverPolicy {
    pub context_ttl: Duration,
    pub forced_ttl: Duration,
    pub retry: RetryPolicy,
}

impl Default for ResolverPolicy {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default(), &ResolverConfig::default())
    }
}

impl ResolverPolicy {
    pub fn from_config(cache: &CacheConfig, resolver: &ResolverConfig) -> Self {
        Self {
            context_ttl: cache.context_ttl(),
            forced_ttl: cache.forced_ttl(),
            retry: resolver.retry_policy(),
        }
    }
}

/// Resolves principals into unified contexts.
pub struct ContextResolver {
    cache: CacheService,
    profiles: Arc<dyn ProfileStore>,
    delegates: Arc<dyn DelegateStore>,
    policy: ResolverPolicy,
    bootstrap_locks: KeyedLocks,
}

impl ContextResolver {
    pub fn new(
        cache: CacheService,
        profiles: Arc<dyn ProfileStore>,
        delegates: Arc<dyn DelegateStore>,
        policy: ResolverPolicy,
    ) -> Self {
        Self {
            cache,
            profiles,
            delegates,
            policy,
            bootstrap_locks: KeyedLocks::new(),
        }
    }

    pub fn cache(&self) -> &CacheService {
        &self.cache
    }

    pub fn policy(&self) -> &ResolverPolicy {
        &self.policy
    }

    /// Resolve a principal once, through the cache.
    ///
    /// With `force_refresh` the cached entry is invalidated first and the new
    /// result lives for the short forced TTL.
    pub async fn resolve(
        &self,
        principal_id: &str,
        force_refresh: bool,
    ) -> Result<Arc<UnifiedContext>, ResolutionError> {
        let ttl = if force_refresh {
            self.cache.invalidate(CONTEXT_NAMESPACE, Some(principal_id));
            self.policy.forced_ttl
        } else {
            self.policy.context_ttl
        };

        let profiles = Arc::clone(&self.profiles);
        let delegates = Arc::clone(&self.delegates);
        let id = principal_id.to_string();
        self.cache
            .get_or_set(CONTEXT_NAMESPACE, principal_id, ttl, move || {
                load_context(profiles, delegates, id)
            })
            .await
    }

    /// [`ContextResolver::resolve`] under the bounded retry policy.
    ///
    /// Only `Timeout` and `Upstream` failures are retried. A timed-out attempt
    /// abandons its in-flight computation so the next attempt starts afresh.
    pub async fn resolve_with_retry(
        &self,
        principal_id: &str,
        force_refresh: bool,
    ) -> Result<Arc<UnifiedContext>, ResolutionError> {
        retry_with_backoff(
            &self.policy.retry,
            "resolve_context",
            |_| self.resolve(principal_id, force_refresh),
            || {
                self.cache.abandon(CONTEXT_NAMESPACE, principal_id);
            },
        )
        .await
    }

    /// Return the principal's profile, creating a minimal one from `claims`
    /// when none exists.
    ///
    /// Serialized per principal and backed by the store's create-if-absent, so
    /// concurrent calls create at most one profile.
    pub async fn ensure_profile(&self, claims: &AuthClaims) -> Result<Profile, ResolutionError> {
        let id = claims.principal_id.as_str();
        if id.trim().is_empty() {
            return Err(ResolutionError::Validation(
                "claims carry an empty principal id".to_string(),
            ));
        }

        let _guard = self.bootstrap_locks.lock(id).await;
        if let Some(profile) = self.profiles.get(id).await? {
            debug!(principal_id = %id, "profile already present; bootstrap skipped");
            return Ok(profile);
        }

        let profile = Profile::bootstrap(claims);
        match self.profiles.create(&profile).await {
            Ok(()) => {
                info!(
                    principal_id = %id,
                    has_email = profile.has_email(),
                    "bootstrapped profile for principal without records"
                );
                Ok(profile)
            }
            Err(StoreError::AlreadyExists(_)) => {
                debug!(principal_id = %id, "profile created concurrently; using stored record");
                self.profiles.get(id).await?.ok_or_else(|| {
                    ResolutionError::Upstream(format!("profile {} vanished after create", id))
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Resolve with retry; on a clean `NotFound` with claims available,
    /// bootstrap a profile once and return the resulting owner context.
    pub async fn resolve_or_bootstrap(
        &self,
        principal_id: &str,
        claims: Option<&AuthClaims>,
    ) -> Result<Arc<UnifiedContext>, ResolutionError> {
        match self.resolve_with_retry(principal_id, false).await {
            Err(ResolutionError::NotFound(missing)) => {
                let Some(claims) = claims else {
                    return Err(ResolutionError::NotFound(missing));
                };
                if claims.principal_id != principal_id {
                    return Err(ResolutionError::Validation(format!(
                        "claims are for {} but {} was resolved",
                        claims.principal_id, principal_id
                    )));
                }
                let profile = self.ensure_profile(claims).await?;
                let context = Arc::new(UnifiedContext::owner(profile));
                self.cache.set(
                    CONTEXT_NAMESPACE,
                    principal_id,
                    Arc::clone(&context),
                    self.policy.context_ttl,
                )?;
                Ok(context)
            }
            other => other,
        }
    }

    /// Apply a profile update and drop every cached context, since delegate
    /// contexts embed their owner's profile.
    pub async fn update_profile(
        &self,
        id: &str,
        update: &ProfileUpdate,
    ) -> Result<Profile, ResolutionError> {
        let profile = self.profiles.update(id, update).await?;
        self.cache.invalidate(CONTEXT_NAMESPACE, None);
        Ok(profile)
    }

    pub async fn set_delegate_permissions(
        &self,
        delegate_id: &str,
        permissions: PermissionSet,
    ) -> Result<DelegateRecord, ResolutionError> {
        let record = self.delegates.set_permissions(delegate_id, permissions).await?;
        self.cache.invalidate(CONTEXT_NAMESPACE, Some(delegate_id));
        Ok(record)
    }

    pub async fn set_delegate_active(
        &self,
        delegate_id: &str,
        active: bool,
    ) -> Result<DelegateRecord, ResolutionError> {
        let record = self.delegates.set_active(delegate_id, active).await?;
        self.cache.invalidate(CONTEXT_NAMESPACE, Some(delegate_id));
        info!(delegate_id = %delegate_id, active, "delegate access changed");
        Ok(record)
    }

    /// Manual cache busting: one key of `scope`, or the whole scope.
    pub fn invalidate(&self, scope: &str, key: Option<&str>) -> usize {
        self.cache.invalidate(scope, key)
    }
}

/// One uncached resolution: owner profile first, then delegate record.
async fn load_context(
    profiles: Arc<dyn ProfileStore>,
    delegates: Arc<dyn DelegateStore>,
    principal_id: String,
) -> Result<Arc<UnifiedContext>, ResolutionError> {
    if let Some(profile) = profiles.get(&principal_id).await? {
        debug!(principal_id = %principal_id, kind = "owner", "context resolved");
        return Ok(Arc::new(UnifiedContext::owner(profile)));
    }

    let Some(record) = delegates.get(&principal_id).await? else {
        return Err(ResolutionError::NotFound(principal_id));
    };
    if !record.active {
        info!(principal_id = %principal_id, "deactivated delegate refused");
        return Err(ResolutionError::Deactivated(principal_id));
    }

    let owner_profile = profiles.get(&record.owner_id).await?.ok_or_else(|| {
        ResolutionError::Upstream(format!(
            "owner profile {} of delegate {} is missing",
            record.owner_id, principal_id
        ))
    })?;

    let touch_store = Arc::clone(&delegates);
    let touch_id = principal_id.clone();
    tokio::spawn(async move {
        if let Err(e) = touch_store.touch_login(&touch_id).await {
            warn!(principal_id = %touch_id, error = %e, "failed to record delegate login");
        }
    });

    let context = UnifiedContext::delegate(record, owner_profile)?;
    debug!(
        principal_id = %principal_id,
        kind = "delegate",
        owner_id = %context.effective_owner_id(),
        "context resolved"
    );
    Ok(Arc::new(context))
}
