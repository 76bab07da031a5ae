// SPDX-FileCopyrightText: 2026 Relaydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The in-flight pairing attempt value owned by the controller.

use tokio_util::sync::CancellationToken;
use tracing::debug;

use relaydesk_core::{AttemptId, ConnectionId, PairingPayload};

use crate::deadline::DeadlineHandle;
use crate::scheduler::PollHandle;

/// One handshake in progress for a connection.
///
/// All timer handles live here; releasing the attempt releases them.
#[derive(Debug)]
pub struct SessionAttempt {
    attempt_id: AttemptId,
    connection_id: ConnectionId,
    pairing_payload: Option<PairingPayload>,
    cancelled: CancellationToken,
    poll: Option<PollHandle>,
    deadline: Option<DeadlineHandle>,
}

impl SessionAttempt {
    pub fn new(attempt_id: AttemptId, connection_id: ConnectionId) -> Self {
        Self {
            attempt_id,
            connection_id,
            pairing_payload: None,
            cancelled: CancellationToken::new(),
            poll: None,
            deadline: None,
        }
    }

    pub fn attempt_id(&self) -> AttemptId {
        self.attempt_id
    }

    pub fn pairing_payload(&self) -> Option<&PairingPayload> {
        self.pairing_payload.as_ref()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.is_cancelled()
    }

    /// Whether this attempt still owns a poll loop or deadline.
    pub fn holds_timers(&self) -> bool {
        self.poll.as_ref().is_some_and(|p| p.is_running())
            || self.deadline.as_ref().is_some_and(|d| d.is_armed())
    }

    /// Enter the polling phase. Requires the payload, so a connection is
    /// never awaiting confirmation without one.
    pub(crate) fn await_confirmation(
        &mut self,
        payload: PairingPayload,
        poll: PollHandle,
        deadline: DeadlineHandle,
    ) {
        self.pairing_payload = Some(payload);
        self.poll = Some(poll);
        self.deadline = Some(deadline);
    }

    /// Mark cancelled and drop every timer handle. Idempotent.
    pub fn release(&mut self) {
        self.cancelled.cancel();
        if self.poll.is_none() && self.deadline.is_none() {
            return;
        }
        if let Some(mut poll) = self.poll.take() {
            poll.stop();
        }
        if let Some(mut deadline) = self.deadline.take() {
            deadline.disarm();
        }
        debug!(
            connection_id = %self.connection_id,
            attempt_id = %self.attempt_id,
            "attempt timers released"
        );
    }
}

impl Drop for SessionAttempt {
    fn drop(&mut self) {
        self.release();
    }
}
