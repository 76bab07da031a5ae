// SPDX-FileCopyrightText: 2026 Relaydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed-interval status polling for one pairing attempt.
//!
//! A tick only issues a check when the previous one has resolved, so at most
//! one status request per attempt is ever outstanding. Checks run in their
//! own task: a check still in flight when the loop is stopped resolves
//! normally and its result is still forwarded. Discarding stale results is
//! the controller's job, not the scheduler's.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use relaydesk_core::{AttemptId, RelaydeskError, StatusReport};

use crate::gauge::{GaugeGuard, LiveGauge};

/// Spawns polling loops on a fixed period.
#[derive(Debug, Clone)]
pub struct PollingScheduler {
    period: Duration,
    live: LiveGauge,
}

impl PollingScheduler {
    /// Loops started by this scheduler are counted in `live` while their
    /// handle is armed.
    pub fn new(period: Duration, live: LiveGauge) -> Self {
        Self { period, live }
    }

    /// Number of armed handles counted by this scheduler's gauge.
    pub fn live_handles(&self) -> usize {
        self.live.get()
    }

    /// Start polling for `attempt_id`. The first check fires one period from now.
    ///
    /// Successful checks are passed to `on_result`; failed checks are logged
    /// and polling continues. A terminal status stops the loop after it has
    /// been forwarded.
    pub fn begin<C, Fut, R>(&self, attempt_id: AttemptId, check: C, on_result: R) -> PollHandle
    where
        C: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<StatusReport, RelaydeskError>> + Send + 'static,
        R: Fn(AttemptId, StatusReport) + Send + Sync + 'static,
    {
        let token = CancellationToken::new();
        let guard = self.live.enter();
        let period = self.period;
        let check = Arc::new(check);
        let on_result = Arc::new(on_result);
        let loop_token = token.clone();

        tokio::spawn(async move {
            let in_flight = Arc::new(AtomicBool::new(false));
            let mut ticks = tokio::time::interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = loop_token.cancelled() => {
                        debug!(attempt_id = %attempt_id, "poll loop stopped");
                        break;
                    }
                    _ = ticks.tick() => {
                        if in_flight.swap(true, Ordering::SeqCst) {
                            debug!(attempt_id = %attempt_id, "previous check unresolved, skipping tick");
                            continue;
                        }
                        let pending = check();
                        let in_flight = in_flight.clone();
                        let on_result = on_result.clone();
                        let stop = loop_token.clone();
                        tokio::spawn(async move {
                            let outcome = pending.await;
                            in_flight.store(false, Ordering::SeqCst);
                            match outcome {
                                Ok(report) => {
                                    if report.status.is_terminal() {
                                        stop.cancel();
                                    }
                                    on_result(attempt_id, report);
                                }
                                Err(e) => {
                                    warn!(attempt_id = %attempt_id, error = %e, "status check failed, will retry");
                                }
                            }
                        });
                    }
                }
            }
        });

        PollHandle {
            attempt_id,
            token,
            guard: Some(guard),
        }
    }
}

/// Ownership of a running poll loop. Dropping the handle stops the loop.
#[derive(Debug)]
pub struct PollHandle {
    attempt_id: AttemptId,
    token: CancellationToken,
    guard: Option<GaugeGuard>,
}

impl PollHandle {
    pub fn attempt_id(&self) -> AttemptId {
        self.attempt_id
    }

    /// Stop ticking. Safe to call repeatedly or after the loop ended itself.
    pub fn stop(&mut self) {
        self.token.cancel();
        self.guard.take();
    }

    /// Whether the loop is still ticking.
    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
