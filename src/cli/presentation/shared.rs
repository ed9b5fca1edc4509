//! Shared presentation: headings, yes/no checks and import summaries.

use crate::error::ApiError;
use crate::store::ImportSummary;
use owo_colors::OwoColorize;
use serde::Serialize;

/// Format a section heading with bold/underline.
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

/// One-line answer of a permission or sensitive-data check.
pub fn format_check_result(principal: &str, subject: &str, allowed: bool) -> String {
    let verdict = if allowed {
        format!("{}", "allowed".green())
    } else {
        format!("{}", "denied".red())
    };
    format!("{} {}: {}", principal, subject, verdict)
}

pub fn format_import_summary(summary: &ImportSummary) -> String {
    format!(
        "Imported {} profile(s) and {} delegate record(s).",
        summary.profiles, summary.delegates
    )
}

pub(super) fn to_pretty_json<T: Serialize>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ApiError::InvalidInput(format!("Failed to serialize output: {}", e)))
}
