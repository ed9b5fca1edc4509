//! Status to refresh-interval table.
//!
//! The same interval serves as the cache TTL of a status and as the period
//! of the background monitor.

use super::ConnectionState;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Poller intervals and provider settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollerConfig {
    #[serde(default = "default_connected_secs")]
    pub connected_secs: u64,

    #[serde(default = "default_disconnected_secs")]
    pub disconnected_secs: u64,

    #[serde(default = "default_error_secs")]
    pub error_secs: u64,

    /// Connecting and awaiting pairing
    #[serde(default = "default_transitional_secs")]
    pub transitional_secs: u64,

    /// Minimum spacing between provider fetches for one subject
    #[serde(default = "default_throttle_secs")]
    pub throttle_secs: u64,

    /// Base URL of the HTTP status provider
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_connected_secs() -> u64 {
    300
}

fn default_disconnected_secs() -> u64 {
    60
}

fn default_error_secs() -> u64 {
    30
}

fn default_transitional_secs() -> u64 {
    8
}

fn default_throttle_secs() -> u64 {
    5
}

fn default_request_timeout_secs() -> u64 {
    20
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            connected_secs: default_connected_secs(),
            disconnected_secs: default_disconnected_secs(),
            error_secs: default_error_secs(),
            transitional_secs: default_transitional_secs(),
            throttle_secs: default_throttle_secs(),
            endpoint: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl PollerConfig {
    pub fn throttle(&self) -> Duration {
        Duration::from_secs(self.throttle_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// How long a status stays fresh, and how long the monitor waits before
/// checking again.
pub fn refresh_interval(state: ConnectionState, config: &PollerConfig) -> Duration {
    let secs = match state {
        ConnectionState::Connected => config.connected_secs,
        ConnectionState::Disconnected => config.disconnected_secs,
        ConnectionState::Error => config.error_secs,
        ConnectionState::Connecting | ConnectionState::AwaitingPairing => {
            config.transitional_secs
        }
    };
    Duration::from_secs(secs)
}
