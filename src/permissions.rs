//! Permission Evaluator
//!
//! Answers whether a resolved context may perform an action on a module, and
//! whether it may see the details of a sensitive data category.

use crate::error::ApiError;
use crate::identity::UnifiedContext;
use std::collections::BTreeMap;

/// Action that unlocks the details of a sensitive category.
pub const VIEW_DETAILS: &str = "view_details";

/// Sensitive data categories and the module whose `view_details` grant
/// unlocks them.
const DEFAULT_SENSITIVE_CATEGORIES: &[(&str, &str)] = &[
    ("patient_records", "patients"),
    ("clinical_history", "medical_records"),
    ("prescriptions", "prescriptions"),
    ("financial", "financial"),
    ("messages", "messaging"),
];

/// Evaluates permissions against a context.
#[derive(Debug, Clone)]
pub struct PermissionEvaluator {
    sensitive: BTreeMap<String, String>,
}

impl Default for PermissionEvaluator {
    fn default() -> Self {
        Self {
            sensitive: DEFAULT_SENSITIVE_CATEGORIES
                .iter()
                .map(|(category, module)| (category.to_string(), module.to_string()))
                .collect(),
        }
    }
}

impl PermissionEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `category` sensitive, guarded by `module`'s `view_details`.
    pub fn with_sensitive_category(mut self, category: &str, module: &str) -> Self {
        self.sensitive
            .insert(category.to_string(), module.to_string());
        self
    }

    /// Module guarding a sensitive category, if the category is sensitive.
    pub fn sensitive_module(&self, category: &str) -> Option<&str> {
        self.sensitive.get(category).map(String::as_str)
    }

    /// Owners may do anything; delegates only what their grant allows.
    /// Absent entries deny.
    pub fn has_permission(&self, context: &UnifiedContext, module: &str, action: &str) -> bool {
        context.is_owner() || context.permissions().allows(module, action)
    }

    /// Sensitive categories need `view_details` on their module; every other
    /// category is visible.
    pub fn can_view_sensitive(&self, context: &UnifiedContext, category: &str) -> bool {
        match self.sensitive_module(category) {
            Some(module) => self.has_permission(context, module, VIEW_DETAILS),
            None => true,
        }
    }

    /// [`PermissionEvaluator::has_permission`] as a `Result`.
    pub fn verify_permission(
        &self,
        context: &UnifiedContext,
        module: &str,
        action: &str,
    ) -> Result<(), ApiError> {
        if !self.has_permission(context, module, action) {
            return Err(ApiError::PermissionDenied(format!(
                "{} {} cannot {} on {}",
                context.principal_kind().as_str(),
                context.principal_id(),
                action,
                module
            )));
        }
        Ok(())
    }
}
