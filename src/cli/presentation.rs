//! CLI presentation: text and json formatters per command family.

mod context;
mod shared;
mod status;

pub use context::{
    format_context_json_output, format_context_text_output, format_decision_json,
    format_decision_text,
};
pub use shared::{format_check_result, format_import_summary, format_section_heading};
pub use status::{format_status_json, format_status_text};
