// SPDX-FileCopyrightText: 2026 Relaydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for Relaydesk.

use thiserror::Error;

use crate::types::{ConnectionId, PlatformType};

/// The primary error type used across all Relaydesk adapter traits and core operations.
#[derive(Debug, Error)]
pub enum RelaydeskError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The referenced connection does not exist in the registry.
    #[error("connection not found: {connection_id}")]
    NotFound { connection_id: ConnectionId },

    /// A connection with the requested id already exists.
    #[error("connection already exists: {connection_id}")]
    AlreadyExists { connection_id: ConnectionId },

    /// The connection's platform has no pairing handshake.
    #[error("connection {connection_id} uses platform `{platform}` which does not support pairing")]
    UnsupportedPlatform {
        connection_id: ConnectionId,
        platform: PlatformType,
    },

    /// The initial request for a pairing payload failed.
    #[error("pairing request failed: {message}")]
    PairingRequest {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A single status check could not complete (network level).
    #[error("status check failed: {message}")]
    TransientPoll {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The remote service reported that the handshake failed.
    #[error("handshake failed: {reason}")]
    TerminalHandshake { reason: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// The attempt was cancelled or superseded before it completed.
    #[error("pairing attempt for {connection_id} was cancelled")]
    Cancelled { connection_id: ConnectionId },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RelaydeskError {
    /// Shorthand for a [`RelaydeskError::NotFound`] on the given connection.
    pub fn not_found(connection_id: &ConnectionId) -> Self {
        Self::NotFound {
            connection_id: connection_id.clone(),
        }
    }

    /// Returns `true` for errors that a later poll may recover from.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientPoll { .. })
    }
}
