// SPDX-FileCopyrightText: 2026 Relaydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pairing service trait for the remote side of the QR-link handshake.

use async_trait::async_trait;

use crate::error::RelaydeskError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ConnectionId, PairingTicket, StatusReport};

/// Remote service that performs the actual platform handshake.
///
/// The session controller only drives this interface; payload generation
/// and device cryptography live on the other side of it.
#[async_trait]
pub trait PairingService: PluginAdapter {
    /// Requests a fresh pairing payload for the connection.
    ///
    /// Failures should be reported as [`RelaydeskError::PairingRequest`].
    async fn request_pairing(
        &self,
        connection_id: &ConnectionId,
    ) -> Result<PairingTicket, RelaydeskError>;

    /// Checks handshake progress.
    ///
    /// Network-level failures should be reported as
    /// [`RelaydeskError::TransientPoll`]; a failed handshake is a successful
    /// call returning [`RemoteStatus::Error`](crate::types::RemoteStatus::Error).
    async fn check_status(
        &self,
        connection_id: &ConnectionId,
    ) -> Result<StatusReport, RelaydeskError>;

    /// Asks the remote side to abandon the handshake. Best effort.
    async fn terminate(&self, connection_id: &ConnectionId) -> Result<(), RelaydeskError>;
}
