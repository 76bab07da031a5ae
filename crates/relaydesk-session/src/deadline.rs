// SPDX-FileCopyrightText: 2026 Relaydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot handshake deadline.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::gauge::{GaugeGuard, LiveGauge};

/// Run `on_elapsed` after `timeout` unless the returned handle is disarmed
/// or dropped first.
pub fn arm<F>(timeout: Duration, gauge: &LiveGauge, on_elapsed: F) -> DeadlineHandle
where
    F: FnOnce() + Send + 'static,
{
    let token = CancellationToken::new();
    let disarmed = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            biased;
            _ = disarmed.cancelled() => {}
            _ = tokio::time::sleep(timeout) => {
                debug!(?timeout, "handshake deadline elapsed");
                on_elapsed();
            }
        }
    });

    DeadlineHandle {
        token,
        guard: Some(gauge.enter()),
    }
}

/// Ownership of an armed deadline.
#[derive(Debug)]
pub struct DeadlineHandle {
    token: CancellationToken,
    guard: Option<GaugeGuard>,
}

impl DeadlineHandle {
    /// Idempotent.
    pub fn disarm(&mut self) {
        self.token.cancel();
        self.guard.take();
    }

    pub fn is_armed(&self) -> bool {
        self.guard.is_some()
    }
}

impl Drop for DeadlineHandle {
    fn drop(&mut self) {
        self.disarm();
    }
}
