// SPDX-FileCopyrightText: 2026 Relaydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the registry, the session controller, and adapters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Unique identifier for a configured connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub String);

impl ConnectionId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Per-connection sequence number of a pairing attempt. `AttemptId(0)` is
/// never handed out; it marks "no attempt yet".
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct AttemptId(pub u64);

impl AttemptId {
    /// The id that follows this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for AttemptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Messaging platform family a connection links to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum PlatformType {
    /// Linked by scanning a QR code from the user's device.
    QrLinked,
    /// Authenticated with a static API token.
    TokenBased,
    /// Receives traffic through an inbound webhook.
    Webhook,
}

impl PlatformType {
    /// Whether connections of this platform go through a pairing handshake.
    pub fn supports_handshake(&self) -> bool {
        matches!(self, PlatformType::QrLinked)
    }
}

/// Current link state of a connection.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    AwaitingConfirmation,
    Connected,
    Error,
}

impl ConnectionStatus {
    /// States a pairing attempt can end in.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionStatus::Connected | ConnectionStatus::Error)
    }

    /// States that only exist while an attempt is in flight.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ConnectionStatus::Connecting | ConnectionStatus::AwaitingConfirmation
        )
    }
}

/// A configured link to a messaging platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub display_name: String,
    pub platform_type: PlatformType,
    pub status: ConnectionStatus,
    pub is_default: bool,
    /// Reason for the last failure; only set while `status` is `Error`.
    pub last_error: Option<String>,
    /// Handshake attempts since the last successful connection.
    pub retry_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Connection {
    /// Build a new `Disconnected` connection from a creation request.
    pub fn from_spec(spec: ConnectionSpec) -> Self {
        let now = Utc::now();
        Self {
            id: spec.id.unwrap_or_else(ConnectionId::generate),
            display_name: spec.display_name,
            platform_type: spec.platform_type,
            status: ConnectionStatus::Disconnected,
            is_default: spec.is_default,
            last_error: None,
            retry_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Request to create a connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSpec {
    /// Explicit id; generated when `None`.
    #[serde(default)]
    pub id: Option<ConnectionId>,
    pub display_name: String,
    pub platform_type: PlatformType,
    #[serde(default)]
    pub is_default: bool,
}

impl ConnectionSpec {
    pub fn new(display_name: impl Into<String>, platform_type: PlatformType) -> Self {
        Self {
            id: None,
            display_name: display_name.into(),
            platform_type,
            is_default: false,
        }
    }

    pub fn with_id(mut self, id: impl Into<ConnectionId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }
}

/// Opaque data the user presents to the platform (e.g. QR contents).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PairingPayload(pub String);

impl std::fmt::Display for PairingPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Response to a pairing request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingTicket {
    pub pairing_payload: PairingPayload,
    pub external_session_id: String,
}

/// Handshake progress as reported by the pairing service.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RemoteStatus {
    Connecting,
    Connected,
    Error,
}

impl RemoteStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RemoteStatus::Connecting)
    }
}

/// Result of a single status check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: RemoteStatus,
    #[serde(default)]
    pub error_reason: Option<String>,
}

impl StatusReport {
    pub fn connecting() -> Self {
        Self {
            status: RemoteStatus::Connecting,
            error_reason: None,
        }
    }

    pub fn connected() -> Self {
        Self {
            status: RemoteStatus::Connected,
            error_reason: None,
        }
    }

    pub fn error(reason: impl Into<String>) -> Self {
        Self {
            status: RemoteStatus::Error,
            error_reason: Some(reason.into()),
        }
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Pairing,
    Storage,
}
