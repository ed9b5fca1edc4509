//! Access Gate
//!
//! Pure navigation decisions from a resolved context and a requested route.
//! The gate never navigates itself; callers apply the returned action.

use crate::error::ResolutionError;
use crate::identity::UnifiedContext;
use serde::{Deserialize, Serialize};

/// Route table the gate decides against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Prefix of the authenticated app area
    #[serde(default = "default_app_prefix")]
    pub app_prefix: String,

    /// Where principals without a context are sent
    #[serde(default = "default_public_entry")]
    pub public_entry: String,

    /// Entry routes an authenticated principal is moved away from
    #[serde(default = "default_public_entries")]
    pub public_entries: Vec<String>,

    #[serde(default = "default_profile_completion")]
    pub profile_completion: String,

    #[serde(default = "default_checkout")]
    pub checkout: String,

    #[serde(default = "default_app_home")]
    pub app_home: String,
}

fn default_app_prefix() -> String {
    "/app".to_string()
}

fn default_public_entry() -> String {
    "/".to_string()
}

fn default_public_entries() -> Vec<String> {
    vec!["/".to_string(), "/login".to_string(), "/signup".to_string()]
}

fn default_profile_completion() -> String {
    "/complete-profile".to_string()
}

fn default_checkout() -> String {
    "/checkout".to_string()
}

fn default_app_home() -> String {
    "/app/dashboard".to_string()
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            app_prefix: default_app_prefix(),
            public_entry: default_public_entry(),
            public_entries: default_public_entries(),
            profile_completion: default_profile_completion(),
            checkout: default_checkout(),
            app_home: default_app_home(),
        }
    }
}

impl RouteConfig {
    /// Every configured path with its field name, for validation.
    pub fn named_paths(&self) -> Vec<(&'static str, &str)> {
        let mut paths = vec![
            ("app_prefix", self.app_prefix.as_str()),
            ("public_entry", self.public_entry.as_str()),
            ("profile_completion", self.profile_completion.as_str()),
            ("checkout", self.checkout.as_str()),
            ("app_home", self.app_home.as_str()),
        ];
        paths.extend(
            self.public_entries
                .iter()
                .map(|entry| ("public_entries", entry.as_str())),
        );
        paths
    }

    /// Whether `route` lies under the app prefix. Matches whole segments:
    /// `/app` and `/app/x` are protected, `/apple` is not.
    pub fn is_protected(&self, route: &str) -> bool {
        let path = normalize(route);
        let prefix = normalize(&self.app_prefix);
        if prefix == "/" {
            return true;
        }
        path == prefix
            || path
                .strip_prefix(prefix)
                .map(|rest| rest.starts_with('/'))
                .unwrap_or(false)
    }

    pub fn is_public_entry(&self, route: &str) -> bool {
        let path = normalize(route);
        self.public_entries
            .iter()
            .any(|entry| normalize(entry) == path)
    }
}

/// Strip query, fragment and trailing slashes. The root stays `/`.
fn normalize(route: &str) -> &str {
    let end = route.find(['?', '#']).unwrap_or(route.len());
    let path = route[..end].trim_end_matches('/');
    if path.is_empty() {
        "/"
    } else {
        path
    }
}

/// Why the gate redirected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectReason {
    NoUser,
    InvalidData,
    NoAccess,
    AlreadyAuthenticated,
    Deactivated,
}

impl RedirectReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RedirectReason::NoUser => "no_user",
            RedirectReason::InvalidData => "invalid_data",
            RedirectReason::NoAccess => "no_access",
            RedirectReason::AlreadyAuthenticated => "already_authenticated",
            RedirectReason::Deactivated => "deactivated",
        }
    }
}

impl std::fmt::Display for RedirectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the caller should do with the requested route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum NavigationAction {
    Stay,
    RedirectTo { path: String, reason: RedirectReason },
}

impl NavigationAction {
    pub fn redirect(path: impl Into<String>, reason: RedirectReason) -> Self {
        NavigationAction::RedirectTo {
            path: path.into(),
            reason,
        }
    }

    pub fn is_stay(&self) -> bool {
        matches!(self, NavigationAction::Stay)
    }

    pub fn reason(&self) -> Option<RedirectReason> {
        match self {
            NavigationAction::Stay => None,
            NavigationAction::RedirectTo { reason, .. } => Some(*reason),
        }
    }
}

/// Decides navigation for a route table.
#[derive(Debug, Clone, Default)]
pub struct AccessGate {
    routes: RouteConfig,
}

impl AccessGate {
    pub fn new(routes: RouteConfig) -> Self {
        Self { routes }
    }

    pub fn routes(&self) -> &RouteConfig {
        &self.routes
    }

    /// Decide what to do with `route` for `context`.
    ///
    /// Rules apply in order: unauthenticated access, incomplete profile,
    /// missing access grant, authenticated principal on a public entry
    /// (unless `bypass`). A redirect to the route already requested becomes
    /// `Stay`.
    pub fn decide(
        &self,
        context: Option<&UnifiedContext>,
        route: &str,
        bypass: bool,
    ) -> NavigationAction {
        let protected = self.routes.is_protected(route);

        let Some(context) = context else {
            if protected {
                return self.redirect(route, &self.routes.public_entry, RedirectReason::NoUser);
            }
            return NavigationAction::Stay;
        };

        let profile = context.owner_profile();
        if !profile.has_valid_data() {
            return self.redirect(
                route,
                &self.routes.profile_completion,
                RedirectReason::InvalidData,
            );
        }
        if !profile.has_access() {
            return self.redirect(route, &self.routes.checkout, RedirectReason::NoAccess);
        }
        if self.routes.is_public_entry(route) && !bypass {
            return self.redirect(
                route,
                &self.routes.app_home,
                RedirectReason::AlreadyAuthenticated,
            );
        }
        NavigationAction::Stay
    }

    /// Navigation after a failed resolution.
    ///
    /// Authorization-shaped failures send the principal to the public entry;
    /// transient and validation failures keep them in place so the caller can
    /// offer a retry.
    pub fn decide_failure(&self, error: &ResolutionError, route: &str) -> NavigationAction {
        if !error.is_authorization() {
            return NavigationAction::Stay;
        }
        let reason = match error {
            ResolutionError::Deactivated(_) => RedirectReason::Deactivated,
            _ => RedirectReason::NoUser,
        };
        self.redirect(route, &self.routes.public_entry, reason)
    }

    fn redirect(&self, current: &str, target: &str, reason: RedirectReason) -> NavigationAction {
        if normalize(current) == normalize(target) {
            return NavigationAction::Stay;
        }
        NavigationAction::redirect(target, reason)
    }
}
