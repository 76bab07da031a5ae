// SPDX-FileCopyrightText: 2026 Relaydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pure mapping from attempt events to connection status changes.
//!
//! This is the only place that decides what a poll result or an elapsed
//! deadline means for a connection. It has no timers and no state, so the
//! whole table is unit tested directly.

use relaydesk_core::{ConnectionStatus, RemoteStatus, StatusReport};

/// `last_error` recorded when the handshake deadline elapses.
pub const TIMEOUT_REASON: &str = "timeout";

/// `last_error` recorded when the remote reports an error without a reason.
pub const UNKNOWN_ERROR_REASON: &str = "unknown error";

/// Something that happened to an in-flight attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptEvent {
    /// A status check completed.
    Polled(StatusReport),
    /// The handshake deadline fired.
    DeadlineElapsed,
}

/// What the controller must do with the attempt after an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Attempt still pending; keep polling.
    Continue,
    /// Attempt is over; release it and record this status.
    Resolve {
        status: ConnectionStatus,
        last_error: Option<String>,
    },
}

pub fn transition(event: &AttemptEvent) -> Transition {
    match event {
        AttemptEvent::Polled(report) => match report.status {
            RemoteStatus::Connecting => Transition::Continue,
            RemoteStatus::Connected => Transition::Resolve {
                status: ConnectionStatus::Connected,
                last_error: None,
            },
            RemoteStatus::Error => {
                let reason = report
                    .error_reason
                    .as_deref()
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .unwrap_or(UNKNOWN_ERROR_REASON);
                Transition::Resolve {
                    status: ConnectionStatus::Error,
                    last_error: Some(reason.to_string()),
                }
            }
        },
        AttemptEvent::DeadlineElapsed => Transition::Resolve {
            status: ConnectionStatus::Error,
            last_error: Some(TIMEOUT_REASON.to_string()),
        },
    }
}
