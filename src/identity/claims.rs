//! Claims supplied by the authentication provider.

use serde::{Deserialize, Serialize};

/// What the authentication provider knows about a principal.
///
/// Used only to bootstrap a profile for an authenticated principal that has
/// neither a profile nor a delegate record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthClaims {
    pub principal_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
}

impl AuthClaims {
    pub fn new(principal_id: impl Into<String>) -> Self {
        Self {
            principal_id: principal_id.into(),
            display_name: None,
            email: None,
            email_verified: false,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>, verified: bool) -> Self {
        self.email = Some(email.into());
        self.email_verified = verified;
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Display name, falling back to the local part of the email.
    pub fn preferred_name(&self) -> String {
        if let Some(name) = self.display_name.as_ref().filter(|n| !n.trim().is_empty()) {
            return name.trim().to_string();
        }
        self.email
            .as_deref()
            .and_then(|email| email.split('@').next())
            .filter(|local| !local.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| "New user".to_string())
    }
}
