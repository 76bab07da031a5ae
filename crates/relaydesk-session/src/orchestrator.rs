// SPDX-FileCopyrightText: 2026 Relaydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-connection entry point composing the registry and the handshake
//! controller. UIs and the CLI talk to this type only.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::stream::{BoxStream, StreamExt};
use tracing::info;

use relaydesk_core::{
    Connection, ConnectionId, ConnectionSpec, ConnectionStatus, PairingPayload, PairingService,
    RelaydeskError,
};

use crate::controller::{HandshakeController, HandshakeTimings};
use crate::registry::ConnectionRegistry;
use crate::transition::TIMEOUT_REASON;

pub struct ConnectionSessionOrchestrator {
    registry: Arc<ConnectionRegistry>,
    controller: HandshakeController,
    disposed: AtomicBool,
}

impl ConnectionSessionOrchestrator {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        pairing: Arc<dyn PairingService>,
        timings: HandshakeTimings,
    ) -> Self {
        let controller = HandshakeController::new(registry.clone(), pairing, timings);
        Self {
            registry,
            controller,
            disposed: AtomicBool::new(false),
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn controller(&self) -> &HandshakeController {
        &self.controller
    }

    /// Start pairing `id` and return the payload to present to the user.
    pub async fn start(&self, id: &ConnectionId) -> Result<PairingPayload, RelaydeskError> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(RelaydeskError::Cancelled {
                connection_id: id.clone(),
            });
        }
        self.controller.start(id).await
    }

    pub async fn cancel(&self, id: &ConnectionId) -> Result<(), RelaydeskError> {
        self.controller.cancel(id).await
    }

    /// Current status of `id` followed by every later transition.
    pub async fn status_stream(
        &self,
        id: &ConnectionId,
    ) -> Result<BoxStream<'static, ConnectionStatus>, RelaydeskError> {
        self.registry.status_stream(id).await
    }

    /// Payload of the attempt in flight for `id`, if any.
    pub async fn pairing_payload(
        &self,
        id: &ConnectionId,
    ) -> Result<Option<PairingPayload>, RelaydeskError> {
        self.registry.get(id).await?;
        Ok(self.controller.pairing_payload(id).await)
    }

    /// Wait until `id` settles after a `start`.
    ///
    /// `Connected` yields the record. `Error` yields `Timeout` when the
    /// deadline expired and `TerminalHandshake` otherwise. `Disconnected`
    /// (cancellation) or deletion yields `Cancelled`.
    pub async fn wait_for_outcome(&self, id: &ConnectionId) -> Result<Connection, RelaydeskError> {
        let mut statuses = self.registry.status_stream(id).await?;
        while let Some(status) = statuses.next().await {
            match status {
                ConnectionStatus::Connecting | ConnectionStatus::AwaitingConfirmation => continue,
                ConnectionStatus::Connected => return self.registry.get(id).await,
                ConnectionStatus::Error => {
                    let connection = self.registry.get(id).await?;
                    let reason = connection.last_error.unwrap_or_default();
                    return Err(if reason == TIMEOUT_REASON {
                        RelaydeskError::Timeout {
                            duration: self.controller.timings().handshake_timeout,
                        }
                    } else {
                        RelaydeskError::TerminalHandshake { reason }
                    });
                }
                ConnectionStatus::Disconnected => break,
            }
        }
        Err(RelaydeskError::Cancelled {
            connection_id: id.clone(),
        })
    }

    pub async fn create(&self, spec: ConnectionSpec) -> Result<Connection, RelaydeskError> {
        self.registry.create(spec).await
    }

    pub async fn list(&self) -> Vec<Connection> {
        self.registry.list().await
    }

    pub async fn get(&self, id: &ConnectionId) -> Result<Connection, RelaydeskError> {
        self.registry.get(id).await
    }

    pub async fn set_default(&self, id: &ConnectionId) -> Result<Connection, RelaydeskError> {
        self.registry.set_default(id).await
    }

    /// Delete `id`, cancelling its live attempt first.
    pub async fn delete(&self, id: &ConnectionId) -> Result<(), RelaydeskError> {
        self.controller.cancel(id).await?;
        self.registry.delete(id).await
    }

    /// Armed poll loops and deadlines across all attempts.
    pub fn active_timers(&self) -> usize {
        self.controller.active_timers()
    }

    pub async fn live_attempts(&self) -> usize {
        self.controller.live_attempts().await
    }

    /// Cancel every live attempt and refuse new ones. Idempotent.
    pub async fn shutdown(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.controller.cancel_all().await;
        info!(active_timers = self.active_timers(), "session orchestrator disposed");
    }
}
