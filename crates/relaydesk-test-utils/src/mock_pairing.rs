// SPDX-FileCopyrightText: 2026 Relaydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scriptable pairing service for deterministic session tests.
//!
//! `MockPairingService` answers status checks from a FIFO script, each entry
//! with its own delay, and records when every call happened. Combine with
//! `#[tokio::test(start_paused = true)]` to drive handshakes on simulated time.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use relaydesk_core::{
    AdapterType, ConnectionId, HealthStatus, PairingPayload, PairingService, PairingTicket,
    PluginAdapter, RelaydeskError, StatusReport,
};

/// One scripted answer to `check_status`.
#[derive(Debug, Clone)]
enum ScriptedCheck {
    Report(StatusReport),
    Transient(String),
}

#[derive(Debug, Default)]
struct MockState {
    pairing_failures: VecDeque<String>,
    pairing_delays: VecDeque<Duration>,
    pairing_calls: Vec<(ConnectionId, Instant)>,
    checks: VecDeque<(Duration, ScriptedCheck)>,
    check_calls: Vec<(ConnectionId, Instant)>,
    terminate_calls: Vec<ConnectionId>,
    fail_terminate: bool,
}

/// A pairing service whose answers are scripted by the test.
///
/// Payloads are `QR-1`, `QR-2`, ... in request order. When the status script
/// is empty, checks answer `Connecting` immediately.
#[derive(Clone, Default)]
pub struct MockPairingService {
    state: Arc<Mutex<MockState>>,
}

impl MockPairingService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an immediate status answer.
    pub async fn push_status(&self, report: StatusReport) {
        self.push_status_after(Duration::ZERO, report).await;
    }

    /// Queue a status answer that takes `delay` to arrive.
    pub async fn push_status_after(&self, delay: Duration, report: StatusReport) {
        self.state
            .lock()
            .await
            .checks
            .push_back((delay, ScriptedCheck::Report(report)));
    }

    /// Queue a network-level check failure.
    pub async fn push_transient_failure(&self, message: &str) {
        self.state
            .lock()
            .await
            .checks
            .push_back((Duration::ZERO, ScriptedCheck::Transient(message.to_string())));
    }

    /// Make the next pairing request fail with `message`.
    pub async fn fail_next_pairing(&self, message: &str) {
        self.state
            .lock()
            .await
            .pairing_failures
            .push_back(message.to_string());
    }

    /// Make the next pairing request take `delay`.
    pub async fn delay_next_pairing(&self, delay: Duration) {
        self.state.lock().await.pairing_delays.push_back(delay);
    }

    /// Make every `terminate` call fail.
    pub async fn fail_terminate(&self, fail: bool) {
        self.state.lock().await.fail_terminate = fail;
    }

    pub async fn pairing_count(&self) -> usize {
        self.state.lock().await.pairing_calls.len()
    }

    pub async fn check_count(&self) -> usize {
        self.state.lock().await.check_calls.len()
    }

    /// When each status check was issued.
    pub async fn check_instants(&self) -> Vec<Instant> {
        self.state
            .lock()
            .await
            .check_calls
            .iter()
            .map(|(_, at)| *at)
            .collect()
    }

    pub async fn terminate_calls(&self) -> Vec<ConnectionId> {
        self.state.lock().await.terminate_calls.clone()
    }
}

#[async_trait]
impl PluginAdapter for MockPairingService {
    fn name(&self) -> &str {
        "mock-pairing"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Pairing
    }

    async fn health_check(&self) -> Result<HealthStatus, RelaydeskError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RelaydeskError> {
        Ok(())
    }
}

#[async_trait]
impl PairingService for MockPairingService {
    async fn request_pairing(
        &self,
        connection_id: &ConnectionId,
    ) -> Result<PairingTicket, RelaydeskError> {
        let (n, delay, failure) = {
            let mut state = self.state.lock().await;
            state
                .pairing_calls
                .push((connection_id.clone(), Instant::now()));
            (
                state.pairing_calls.len(),
                state.pairing_delays.pop_front().unwrap_or_default(),
                state.pairing_failures.pop_front(),
            )
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match failure {
            Some(message) => Err(RelaydeskError::PairingRequest {
                message,
                source: None,
            }),
            None => Ok(PairingTicket {
                pairing_payload: PairingPayload(format!("QR-{n}")),
                external_session_id: format!("ext-{connection_id}-{n}"),
            }),
        }
    }

    async fn check_status(
        &self,
        connection_id: &ConnectionId,
    ) -> Result<StatusReport, RelaydeskError> {
        let (delay, scripted) = {
            let mut state = self.state.lock().await;
            state
                .check_calls
                .push((connection_id.clone(), Instant::now()));
            state.checks.pop_front().unwrap_or((
                Duration::ZERO,
                ScriptedCheck::Report(StatusReport::connecting()),
            ))
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match scripted {
            ScriptedCheck::Report(report) => Ok(report),
            ScriptedCheck::Transient(message) => Err(RelaydeskError::TransientPoll {
                message,
                source: None,
            }),
        }
    }

    async fn terminate(&self, connection_id: &ConnectionId) -> Result<(), RelaydeskError> {
        let mut state = self.state.lock().await;
        state.terminate_calls.push(connection_id.clone());
        if state.fail_terminate {
            return Err(RelaydeskError::Internal("terminate unreachable".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn payloads_are_numbered() {
        let mock = MockPairingService::new();
        let id = ConnectionId::from("c1");
        let first = mock.request_pairing(&id).await.unwrap();
        let second = mock.request_pairing(&id).await.unwrap();
        assert_eq!(first.pairing_payload, PairingPayload("QR-1".into()));
        assert_eq!(second.pairing_payload, PairingPayload("QR-2".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn scripted_checks_then_connecting() {
        let mock = MockPairingService::new();
        let id = ConnectionId::from("c1");
        mock.push_status(StatusReport::connected()).await;
        mock.push_transient_failure("reset").await;

        assert_eq!(mock.check_status(&id).await.unwrap(), StatusReport::connected());
        assert!(mock.check_status(&id).await.unwrap_err().is_transient());
        assert_eq!(mock.check_status(&id).await.unwrap(), StatusReport::connecting());
        assert_eq!(mock.check_count().await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_answer_takes_simulated_time() {
        let mock = MockPairingService::new();
        mock.push_status_after(Duration::from_secs(5), StatusReport::error("rejected"))
            .await;
        let started = Instant::now();
        let report = mock.check_status(&ConnectionId::from("c1")).await.unwrap();
        assert_eq!(report, StatusReport::error("rejected"));
        assert!(started.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test]
    async fn failures_are_one_shot() {
        let mock = MockPairingService::new();
        let id = ConnectionId::from("c1");
        mock.fail_next_pairing("503").await;
        assert!(matches!(
            mock.request_pairing(&id).await,
            Err(RelaydeskError::PairingRequest { .. })
        ));
        assert!(mock.request_pairing(&id).await.is_ok());

        mock.fail_terminate(true).await;
        assert!(mock.terminate(&id).await.is_err());
        assert_eq!(mock.terminate_calls().await, vec![id]);
    }
}
