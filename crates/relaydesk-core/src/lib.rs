// SPDX-FileCopyrightText: 2026 Relaydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for Relaydesk.
//!
//! This crate provides the error type, the connection domain types, and the
//! adapter traits the session lifecycle depends on. Pairing services and
//! connection stores implement traits defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::RelaydeskError;
pub use types::{
    AdapterType, AttemptId, Connection, ConnectionId, ConnectionSpec, ConnectionStatus,
    HealthStatus, PairingPayload, PairingTicket, PlatformType, RemoteStatus, StatusReport,
};

pub use traits::{ConnectionStore, PairingService, PluginAdapter};
