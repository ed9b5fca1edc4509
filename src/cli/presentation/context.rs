//! Context and gate presentation: text and json formatters.

use super::shared::{format_section_heading, to_pretty_json};
use crate::access::NavigationAction;
use crate::error::ApiError;
use crate::identity::{PermissionSet, UnifiedContext};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use serde_json::json;

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn permission_rows(permissions: &PermissionSet) -> Vec<(String, String)> {
    match permissions {
        PermissionSet::Full => vec![("*".to_string(), "full".to_string())],
        PermissionSet::Map(map) => map
            .iter()
            .map(|(module, actions)| {
                let granted: Vec<&str> = actions
                    .iter()
                    .filter(|(_, allowed)| **allowed)
                    .map(|(action, _)| action.as_str())
                    .collect();
                let granted = if granted.is_empty() {
                    "-".to_string()
                } else {
                    granted.join(", ")
                };
                (module.clone(), granted)
            })
            .collect(),
    }
}

pub fn format_context_text_output(context: &UnifiedContext) -> String {
    let profile = context.owner_profile();
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Context")));
    out.push_str(&format!("  Principal: {}\n", context.principal_id()));
    out.push_str(&format!("  Kind: {}\n", context.principal_kind().as_str()));
    out.push_str(&format!("  Effective owner: {}\n", context.effective_owner_id()));
    out.push_str(&format!("  Owner name: {}\n", profile.display_name));
    if let Some(record) = context.delegate_record() {
        out.push_str(&format!("  Delegate active: {}\n", yes_no(record.active)));
        out.push_str(&format!("  Delegate logins: {}\n", record.login_count));
    }
    out.push_str(&format!("  Valid data: {}\n", yes_no(profile.has_valid_data())));
    out.push_str(&format!("  Plan access: {}\n\n", yes_no(profile.has_access())));

    out.push_str(&format!("{}\n\n", format_section_heading("Permissions")));
    let rows = permission_rows(context.permissions());
    if rows.is_empty() {
        out.push_str("  No permissions granted.\n");
        return out;
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Module", "Actions"]);
    for (module, actions) in rows {
        table.add_row(vec![module, actions]);
    }
    out.push_str(&format!("{}\n", table));
    out
}

pub fn format_context_json_output(context: &UnifiedContext) -> Result<String, ApiError> {
    let profile = context.owner_profile();
    let out = json!({
        "context": context,
        "has_valid_data": profile.has_valid_data(),
        "has_access": profile.has_access(),
    });
    to_pretty_json(&out)
}

pub fn format_decision_text(route: &str, action: &NavigationAction) -> String {
    match action {
        NavigationAction::Stay => format!("{}: stay", route),
        NavigationAction::RedirectTo { path, reason } => {
            format!("{}: redirect to {} ({})", route, path, reason)
        }
    }
}

pub fn format_decision_json(route: &str, action: &NavigationAction) -> Result<String, ApiError> {
    to_pretty_json(&json!({ "route": route, "decision": action }))
}
