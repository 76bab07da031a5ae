// SPDX-FileCopyrightText: 2026 Relaydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Drives pairing attempts to a terminal outcome.
//!
//! Each connection has at most one live [`SessionAttempt`], stored in a map
//! keyed by connection id together with the last attempt id handed out.
//! Poll results and deadline expiries arrive as attempt-tagged events on a
//! channel drained by a single driver task. An event is applied only when
//! its attempt is still the connection's live, uncancelled attempt.
//!
//! Lock order is always `attempts` then registry.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use relaydesk_config::model::SessionConfig;
use relaydesk_core::{
    AttemptId, ConnectionId, ConnectionStatus, PairingPayload, PairingService, RelaydeskError,
    StatusReport,
};

use crate::attempt::SessionAttempt;
use crate::deadline;
use crate::gauge::LiveGauge;
use crate::registry::ConnectionRegistry;
use crate::scheduler::PollingScheduler;
use crate::transition::{transition, AttemptEvent, Transition};

/// Poll period and deadline of a pairing attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeTimings {
    pub poll_interval: Duration,
    pub handshake_timeout: Duration,
}

impl Default for HandshakeTimings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
            handshake_timeout: Duration::from_secs(120),
        }
    }
}

impl From<&SessionConfig> for HandshakeTimings {
    fn from(config: &SessionConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            handshake_timeout: config.handshake_timeout(),
        }
    }
}

#[derive(Debug)]
struct TaggedEvent {
    connection_id: ConnectionId,
    attempt_id: AttemptId,
    event: AttemptEvent,
}

#[derive(Debug, Default)]
struct AttemptSlot {
    last_attempt_id: AttemptId,
    live: Option<SessionAttempt>,
}

impl AttemptSlot {
    fn is_current(&self, attempt_id: AttemptId) -> bool {
        self.live
            .as_ref()
            .is_some_and(|a| a.attempt_id() == attempt_id && !a.is_cancelled())
    }
}

struct Inner {
    registry: Arc<ConnectionRegistry>,
    pairing: Arc<dyn PairingService>,
    scheduler: PollingScheduler,
    timings: HandshakeTimings,
    timers: LiveGauge,
    attempts: Mutex<HashMap<ConnectionId, AttemptSlot>>,
    events: mpsc::UnboundedSender<TaggedEvent>,
}

/// Owner of every in-flight pairing attempt.
pub struct HandshakeController {
    inner: Arc<Inner>,
    driver: JoinHandle<()>,
}

impl HandshakeController {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        pairing: Arc<dyn PairingService>,
        timings: HandshakeTimings,
    ) -> Self {
        let (events, rx) = mpsc::unbounded_channel();
        let timers = LiveGauge::new();
        let inner = Arc::new(Inner {
            registry,
            pairing,
            scheduler: PollingScheduler::new(timings.poll_interval, timers.clone()),
            timings,
            timers,
            attempts: Mutex::new(HashMap::new()),
            events,
        });
        let driver = tokio::spawn(drive(Arc::downgrade(&inner), rx));
        Self { inner, driver }
    }

    pub fn timings(&self) -> HandshakeTimings {
        self.inner.timings
    }

    /// Begin a new pairing attempt for `id`, superseding any live one.
    ///
    /// Returns the payload to show the user once the pairing service has
    /// produced it. Fails with `Cancelled` if the attempt was cancelled or
    /// superseded while the payload was being requested.
    pub async fn start(&self, id: &ConnectionId) -> Result<PairingPayload, RelaydeskError> {
        self.inner.start(id).await
    }

    /// Cancel the live attempt for `id`, if any, and return it to `Disconnected`.
    pub async fn cancel(&self, id: &ConnectionId) -> Result<(), RelaydeskError> {
        self.inner.cancel(id).await
    }

    /// Apply a status check result for `attempt_id`.
    ///
    /// Results for anything but the connection's live attempt are dropped.
    pub async fn on_poll_result(
        &self,
        connection_id: &ConnectionId,
        attempt_id: AttemptId,
        report: StatusReport,
    ) {
        self.inner
            .apply_event(TaggedEvent {
                connection_id: connection_id.clone(),
                attempt_id,
                event: AttemptEvent::Polled(report),
            })
            .await;
    }

    /// Id of the live attempt for `id`, if one is in flight.
    pub async fn current_attempt(&self, id: &ConnectionId) -> Option<AttemptId> {
        let attempts = self.inner.attempts.lock().await;
        attempts
            .get(id)
            .and_then(|slot| slot.live.as_ref())
            .map(SessionAttempt::attempt_id)
    }

    /// Payload of the live attempt for `id`, once it has one.
    pub async fn pairing_payload(&self, id: &ConnectionId) -> Option<PairingPayload> {
        let attempts = self.inner.attempts.lock().await;
        attempts
            .get(id)
            .and_then(|slot| slot.live.as_ref())
            .and_then(|a| a.pairing_payload().cloned())
    }

    /// Number of live attempts across all connections.
    pub async fn live_attempts(&self) -> usize {
        let attempts = self.inner.attempts.lock().await;
        attempts.values().filter(|s| s.live.is_some()).count()
    }

    /// Number of armed poll loops plus armed deadlines.
    pub fn active_timers(&self) -> usize {
        self.inner.timers.get()
    }

    /// Cancel every live attempt. Used on shutdown.
    pub async fn cancel_all(&self) {
        self.inner.cancel_all().await;
    }
}

impl Drop for HandshakeController {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

impl Inner {
    async fn start(&self, id: &ConnectionId) -> Result<PairingPayload, RelaydeskError> {
        let connection = self.registry.get(id).await?;
        if !connection.platform_type.supports_handshake() {
            return Err(RelaydeskError::UnsupportedPlatform {
                connection_id: id.clone(),
                platform: connection.platform_type,
            });
        }

        let attempt_id = {
            let mut attempts = self.attempts.lock().await;
            let slot = attempts.entry(id.clone()).or_default();
            if let Some(mut prior) = slot.live.take() {
                prior.release();
                info!(
                    connection_id = %id,
                    attempt_id = %prior.attempt_id(),
                    "superseded live pairing attempt"
                );
            }
            let attempt_id = slot.last_attempt_id.next();
            slot.last_attempt_id = attempt_id;
            slot.live = Some(SessionAttempt::new(attempt_id, id.clone()));

            if let Err(e) = self
                .registry
                .apply_status(id, ConnectionStatus::Connecting, None)
                .await
            {
                slot.live = None;
                return Err(e);
            }
            attempt_id
        };
        info!(connection_id = %id, attempt_id = %attempt_id, "pairing attempt started");

        let requested = self.pairing.request_pairing(id).await;

        let mut attempts = self.attempts.lock().await;
        let slot = match attempts.get_mut(id) {
            Some(slot) if slot.is_current(attempt_id) => slot,
            _ => {
                debug!(
                    connection_id = %id,
                    attempt_id = %attempt_id,
                    "attempt ended while pairing was requested"
                );
                return Err(RelaydeskError::Cancelled {
                    connection_id: id.clone(),
                });
            }
        };

        let ticket = match requested {
            Ok(ticket) => ticket,
            Err(e) => {
                slot.live = None;
                let (reason, err) = pairing_failure(e);
                warn!(
                    connection_id = %id,
                    attempt_id = %attempt_id,
                    reason = %reason,
                    "pairing request failed"
                );
                self.registry
                    .apply_status(id, ConnectionStatus::Error, Some(reason))
                    .await?;
                return Err(err);
            }
        };

        let poll = self.scheduler.begin(
            attempt_id,
            {
                let pairing = self.pairing.clone();
                let id = id.clone();
                move || {
                    let pairing = pairing.clone();
                    let id = id.clone();
                    async move { pairing.check_status(&id).await }
                }
            },
            {
                let events = self.events.clone();
                let id = id.clone();
                move |attempt_id, report| {
                    let _ = events.send(TaggedEvent {
                        connection_id: id.clone(),
                        attempt_id,
                        event: AttemptEvent::Polled(report),
                    });
                }
            },
        );
        let deadline = {
            let events = self.events.clone();
            let id = id.clone();
            deadline::arm(self.timings.handshake_timeout, &self.timers, move || {
                let _ = events.send(TaggedEvent {
                    connection_id: id,
                    attempt_id,
                    event: AttemptEvent::DeadlineElapsed,
                });
            })
        };

        let payload = ticket.pairing_payload;
        if let Some(attempt) = slot.live.as_mut() {
            attempt.await_confirmation(payload.clone(), poll, deadline);
        }
        if let Err(e) = self
            .registry
            .apply_status(id, ConnectionStatus::AwaitingConfirmation, None)
            .await
        {
            slot.live = None;
            return Err(e);
        }
        info!(
            connection_id = %id,
            attempt_id = %attempt_id,
            external_session_id = %ticket.external_session_id,
            "awaiting pairing confirmation"
        );
        Ok(payload)
    }

    async fn cancel(&self, id: &ConnectionId) -> Result<(), RelaydeskError> {
        self.registry.get(id).await?;

        let cancelled = {
            let mut attempts = self.attempts.lock().await;
            match attempts.get_mut(id).and_then(|slot| slot.live.take()) {
                Some(mut attempt) => {
                    attempt.release();
                    self.registry
                        .apply_status(id, ConnectionStatus::Disconnected, None)
                        .await?;
                    info!(
                        connection_id = %id,
                        attempt_id = %attempt.attempt_id(),
                        "pairing attempt cancelled"
                    );
                    true
                }
                None => false,
            }
        };

        if cancelled {
            self.terminate(id).await;
        } else {
            debug!(connection_id = %id, "no live attempt to cancel");
        }
        Ok(())
    }

    async fn cancel_all(&self) {
        let cancelled: Vec<ConnectionId> = {
            let mut attempts = self.attempts.lock().await;
            let mut cancelled = Vec::new();
            for (id, slot) in attempts.iter_mut() {
                let Some(mut attempt) = slot.live.take() else {
                    continue;
                };
                attempt.release();
                if let Err(e) = self
                    .registry
                    .apply_status(id, ConnectionStatus::Disconnected, None)
                    .await
                {
                    warn!(connection_id = %id, error = %e, "could not reset cancelled connection");
                }
                cancelled.push(id.clone());
            }
            cancelled
        };

        if !cancelled.is_empty() {
            info!(count = cancelled.len(), "cancelled all live pairing attempts");
        }
        for id in &cancelled {
            self.terminate(id).await;
        }
    }

    async fn terminate(&self, id: &ConnectionId) {
        if let Err(e) = self.pairing.terminate(id).await {
            warn!(connection_id = %id, error = %e, "remote terminate failed");
        }
    }

    async fn apply_event(&self, tagged: TaggedEvent) {
        let TaggedEvent {
            connection_id,
            attempt_id,
            event,
        } = tagged;

        let mut attempts = self.attempts.lock().await;
        let Some(slot) = attempts.get_mut(&connection_id) else {
            debug!(connection_id = %connection_id, "event for unknown connection dropped");
            return;
        };
        if !slot.is_current(attempt_id) {
            debug!(
                connection_id = %connection_id,
                attempt_id = %attempt_id,
                ?event,
                "discarding stale attempt event"
            );
            return;
        }

        match transition(&event) {
            Transition::Continue => {
                debug!(connection_id = %connection_id, attempt_id = %attempt_id, "handshake pending");
            }
            Transition::Resolve { status, last_error } => {
                if let Some(mut attempt) = slot.live.take() {
                    attempt.release();
                }
                match self
                    .registry
                    .apply_status(&connection_id, status, last_error.clone())
                    .await
                {
                    Ok(_) => info!(
                        connection_id = %connection_id,
                        attempt_id = %attempt_id,
                        status = %status,
                        last_error = last_error.as_deref().unwrap_or(""),
                        "pairing attempt resolved"
                    ),
                    Err(e) => warn!(
                        connection_id = %connection_id,
                        attempt_id = %attempt_id,
                        error = %e,
                        "could not record attempt outcome"
                    ),
                }
            }
        }
    }
}

/// Split a pairing-request failure into the `last_error` text and the
/// error returned to the caller.
fn pairing_failure(e: RelaydeskError) -> (String, RelaydeskError) {
    match e {
        RelaydeskError::PairingRequest { message, source } => (
            message.clone(),
            RelaydeskError::PairingRequest { message, source },
        ),
        other => {
            let message = other.to_string();
            (
                message.clone(),
                RelaydeskError::PairingRequest {
                    message,
                    source: Some(Box::new(other)),
                },
            )
        }
    }
}

async fn drive(inner: Weak<Inner>, mut rx: mpsc::UnboundedReceiver<TaggedEvent>) {
    while let Some(event) = rx.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        inner.apply_event(event).await;
    }
    debug!("attempt event driver stopped");
}
