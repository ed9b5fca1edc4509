//! Connection status presentation.

use super::shared::{format_section_heading, to_pretty_json};
use crate::error::ApiError;
use crate::status::{refresh_interval, ConnectionState, ConnectionStatus, PollerConfig};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde_json::json;

fn styled_state(state: ConnectionState) -> String {
    match state {
        ConnectionState::Connected => format!("{}", state.as_str().green()),
        ConnectionState::Error => format!("{}", state.as_str().red()),
        ConnectionState::Disconnected => format!("{}", state.as_str().dimmed()),
        ConnectionState::Connecting | ConnectionState::AwaitingPairing => {
            format!("{}", state.as_str().yellow())
        }
    }
}

pub fn format_status_text(subject: &str, status: &ConnectionStatus, config: &PollerConfig) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Connection Status")));
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Field", "Value"]);
    table.add_row(vec!["Subject".to_string(), subject.to_string()]);
    table.add_row(vec!["State".to_string(), styled_state(status.state)]);
    if let Some(peer) = &status.peer_identifier {
        table.add_row(vec!["Peer".to_string(), peer.clone()]);
    }
    if let Some(name) = &status.display_name {
        table.add_row(vec!["Name".to_string(), name.clone()]);
    }
    if let Some(artifact) = &status.pairing_artifact {
        table.add_row(vec!["Pairing".to_string(), artifact.clone()]);
    }
    if let Some(detail) = &status.detail {
        table.add_row(vec!["Detail".to_string(), detail.clone()]);
    }
    table.add_row(vec![
        "Next check".to_string(),
        format!("{}s", refresh_interval(status.state, config).as_secs()),
    ]);
    out.push_str(&format!("{}\n", table));
    out
}

pub fn format_status_json(
    subject: &str,
    status: &ConnectionStatus,
    config: &PollerConfig,
) -> Result<String, ApiError> {
    to_pretty_json(&json!({
        "subject": subject,
        "status": status,
        "next_check_secs": refresh_interval(status.state, config).as_secs(),
    }))
}
