//! CLI domain: parse, route, output, and presentation only.
//! No domain orchestration; single route table dispatches to domain services.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands, DelegateCommands, StatusCommands};
pub use presentation::{
    format_check_result, format_context_json_output, format_context_text_output,
    format_decision_json, format_decision_text, format_import_summary, format_section_heading,
    format_status_json, format_status_text,
};
pub use route::RunContext;
