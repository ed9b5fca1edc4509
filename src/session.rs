//! Identity Session
//!
//! Caller-side state around the resolver: who is signed in, what the gate
//! says about a route, and which connection status is being watched. Results
//! of resolutions started before a newer sign-in or sign-out are discarded.

use crate::access::{AccessGate, NavigationAction};
use crate::error::ResolutionError;
use crate::identity::{AuthClaims, UnifiedContext};
use crate::permissions::PermissionEvaluator;
use crate::resolver::ContextResolver;
use crate::status::{ConnectionStatus, StatusMonitor, StatusPoller};
use crate::types::CONTEXT_NAMESPACE;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Current authentication state.
#[derive(Debug, Clone, Default)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    Authenticated(Arc<UnifiedContext>),
}

/// Result of a sign-in or refresh that was not superseded.
#[derive(Debug, Clone)]
pub enum SignInOutcome {
    Authenticated {
        context: Arc<UnifiedContext>,
        action: NavigationAction,
    },
    /// A newer sign-in or sign-out started meanwhile; nothing was applied.
    Superseded,
}

/// A failed resolution, with the navigation the caller should perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFailure {
    pub error: ResolutionError,
    pub action: NavigationAction,
    /// Transient failure: offer a retry instead of redirecting.
    pub retryable: bool,
}

impl std::fmt::Display for SessionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for SessionFailure {}

#[derive(Default)]
struct SessionInner {
    state: SessionState,
    principal_id: Option<String>,
    generation: u64,
    monitor: Option<StatusMonitor>,
}

pub struct IdentitySession {
    resolver: Arc<ContextResolver>,
    gate: AccessGate,
    evaluator: PermissionEvaluator,
    poller: Option<Arc<StatusPoller>>,
    inner: Mutex<SessionInner>,
}

impl IdentitySession {
    pub fn new(resolver: Arc<ContextResolver>, gate: AccessGate) -> Self {
        Self {
            resolver,
            gate,
            evaluator: PermissionEvaluator::new(),
            poller: None,
            inner: Mutex::new(SessionInner::default()),
        }
    }

    /// Watch the connection status of the signed-in principal's effective owner.
    pub fn with_poller(mut self, poller: Arc<StatusPoller>) -> Self {
        self.poller = Some(poller);
        self
    }

    pub fn with_evaluator(mut self, evaluator: PermissionEvaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Resolve `principal_id` (bootstrapping a profile from `claims` when it
    /// has no records) and decide navigation for `route`.
    pub async fn sign_in(
        &self,
        principal_id: &str,
        claims: Option<&AuthClaims>,
        route: &str,
    ) -> Result<SignInOutcome, SessionFailure> {
        let generation = self.begin(Some(principal_id));
        let result = self.resolver.resolve_or_bootstrap(principal_id, claims).await;
        self.apply(generation, principal_id, result, route)
    }

    /// Re-resolve the signed-in principal, bypassing the cache.
    pub async fn refresh(&self, route: &str) -> Result<SignInOutcome, SessionFailure> {
        let Some(principal_id) = self.inner.lock().principal_id.clone() else {
            return Err(SessionFailure {
                error: ResolutionError::Validation("no principal is signed in".to_string()),
                action: NavigationAction::Stay,
                retryable: false,
            });
        };
        let generation = self.begin(Some(&principal_id));
        let result = self.resolver.resolve_with_retry(&principal_id, true).await;
        self.apply(generation, &principal_id, result, route)
    }

    /// Forget the current principal. In-flight resolutions are discarded.
    pub fn sign_out(&self) {
        let previous = self.inner.lock().principal_id.clone();
        self.begin(None);
        if let Some(id) = previous {
            self.resolver.invalidate(CONTEXT_NAMESPACE, Some(&id));
            info!(principal_id = %id, "signed out");
        }
    }

    /// Gate decision for `route` against the current context.
    pub fn navigate(&self, route: &str, bypass: bool) -> NavigationAction {
        let context = self.context();
        self.gate.decide(context.as_deref(), route, bypass)
    }

    /// Permission check against the current context; unauthenticated denies.
    pub fn can(&self, module: &str, action: &str) -> bool {
        self.context()
            .map(|ctx| self.evaluator.has_permission(&ctx, module, action))
            .unwrap_or(false)
    }

    pub fn can_view_sensitive(&self, category: &str) -> bool {
        self.context()
            .map(|ctx| self.evaluator.can_view_sensitive(&ctx, category))
            .unwrap_or(false)
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().state.clone()
    }

    pub fn context(&self) -> Option<Arc<UnifiedContext>> {
        match &self.inner.lock().state {
            SessionState::Authenticated(ctx) => Some(Arc::clone(ctx)),
            SessionState::Unauthenticated => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.inner.lock().state, SessionState::Authenticated(_))
    }

    /// Last observed connection status of the effective owner, if watched.
    pub fn connection_status(&self) -> Option<ConnectionStatus> {
        let poller = self.poller.as_ref()?;
        let inner = self.inner.lock();
        let subject = inner.monitor.as_ref()?.subject().to_string();
        drop(inner);
        poller.latest(&subject)
    }

    /// Whether a status monitor is running for this session.
    pub fn is_monitoring(&self) -> bool {
        self.inner
            .lock()
            .monitor
            .as_ref()
            .map(StatusMonitor::is_running)
            .unwrap_or(false)
    }

    /// Start a new generation. Without a principal the session is reset to
    /// unauthenticated right away.
    fn begin(&self, principal_id: Option<&str>) -> u64 {
        let mut inner = self.inner.lock();
        inner.generation += 1;
        if principal_id.is_none() || inner.principal_id.as_deref() != principal_id {
            inner.state = SessionState::Unauthenticated;
            inner.monitor = None;
        }
        inner.principal_id = principal_id.map(str::to_string);
        inner.generation
    }

    fn apply(
        &self,
        generation: u64,
        principal_id: &str,
        result: Result<Arc<UnifiedContext>, ResolutionError>,
        route: &str,
    ) -> Result<SignInOutcome, SessionFailure> {
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            debug!(
                principal_id = %principal_id,
                generation,
                current = inner.generation,
                "superseded resolution discarded"
            );
            return Ok(SignInOutcome::Superseded);
        }

        match result {
            Ok(context) => {
                inner.state = SessionState::Authenticated(Arc::clone(&context));
                self.watch_owner(&mut inner, context.effective_owner_id());
                let action = self.gate.decide(Some(&context), route, false);
                debug!(
                    principal_id = %principal_id,
                    kind = context.principal_kind().as_str(),
                    action = ?action,
                    "session authenticated"
                );
                Ok(SignInOutcome::Authenticated { context, action })
            }
            Err(error) => {
                inner.state = SessionState::Unauthenticated;
                inner.monitor = None;
                let action = self.gate.decide_failure(&error, route);
                warn!(
                    principal_id = %principal_id,
                    error = %error,
                    kind = error.kind(),
                    "session reset to unauthenticated"
                );
                Err(SessionFailure {
                    retryable: error.is_retryable(),
                    error,
                    action,
                })
            }
        }
    }

    fn watch_owner(&self, inner: &mut SessionInner, owner_id: &str) {
        let Some(poller) = &self.poller else {
            return;
        };
        let watching = inner
            .monitor
            .as_ref()
            .map(|monitor| monitor.subject() == owner_id)
            .unwrap_or(false);
        if !watching {
            inner.monitor = Some(poller.spawn_monitor(owner_id));
        }
    }
}
