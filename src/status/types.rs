//! Connection status values and the provider payload they are built from.

use crate::error::StatusError;
use serde::{Deserialize, Serialize};

/// State of an external messaging session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    AwaitingPairing,
    Connected,
    Error,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::AwaitingPairing => "awaiting_pairing",
            ConnectionState::Connected => "connected",
            ConnectionState::Error => "error",
        }
    }

    /// States expected to change within seconds.
    pub fn is_transitional(self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting | ConnectionState::AwaitingPairing
        )
    }

    /// Parse the provider's state vocabulary.
    pub fn from_provider(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "open" | "connected" => Some(ConnectionState::Connected),
            "close" | "closed" | "disconnected" => Some(ConnectionState::Disconnected),
            "connecting" => Some(ConnectionState::Connecting),
            "qr" | "pairing" | "awaiting_pairing" => Some(ConnectionState::AwaitingPairing),
            "error" | "failed" => Some(ConnectionState::Error),
            _ => None,
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last observed status of a subject's connection. Each poll overwrites the
/// previous value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pairing_artifact: Option<String>,
    /// Failure description when `state` is `Error`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ConnectionStatus {
    pub fn new(state: ConnectionState) -> Self {
        Self {
            state,
            peer_identifier: None,
            display_name: None,
            pairing_artifact: None,
            detail: None,
        }
    }

    pub fn disconnected() -> Self {
        Self::new(ConnectionState::Disconnected)
    }

    pub fn awaiting_pairing(artifact: impl Into<String>) -> Self {
        Self {
            pairing_artifact: Some(artifact.into()),
            ..Self::new(ConnectionState::AwaitingPairing)
        }
    }

    pub fn error(detail: impl Into<String>) -> Self {
        Self {
            detail: Some(detail.into()),
            ..Self::new(ConnectionState::Error)
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}

/// Status payload as returned by the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawStatusPayload {
    #[serde(alias = "status")]
    pub state: String,
    #[serde(default, alias = "peer", alias = "jid")]
    pub peer_identifier: Option<String>,
    #[serde(default, alias = "name", alias = "push_name")]
    pub display_name: Option<String>,
    #[serde(default, alias = "qr", alias = "qr_code")]
    pub pairing_artifact: Option<String>,
    #[serde(default, alias = "message")]
    pub error: Option<String>,
}

impl RawStatusPayload {
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            ..Default::default()
        }
    }

    /// Map to a [`ConnectionStatus`]. Unknown states are a validation failure.
    pub fn into_status(self) -> Result<ConnectionStatus, StatusError> {
        let state = ConnectionState::from_provider(&self.state).ok_or_else(|| {
            StatusError::Validation(format!("unknown connection state '{}'", self.state))
        })?;

        let pairing_artifact = match state {
            ConnectionState::AwaitingPairing => self.pairing_artifact,
            _ => None,
        };
        let detail = match state {
            ConnectionState::Error => self.error,
            _ => None,
        };

        Ok(ConnectionStatus {
            state,
            peer_identifier: self.peer_identifier.filter(|p| !p.is_empty()),
            display_name: self.display_name.filter(|n| !n.is_empty()),
            pairing_artifact,
            detail,
        })
    }
}
