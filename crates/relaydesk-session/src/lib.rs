// SPDX-FileCopyrightText: 2026 Relaydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection session lifecycle for Relaydesk.
//!
//! - [`ConnectionRegistry`] holds connection records and publishes status changes.
//! - [`PollingScheduler`] polls one attempt on a fixed period, one check at a time.
//! - [`HandshakeController`] owns the live [`SessionAttempt`] per connection and
//!   applies attempt-tagged results through [`transition::transition`].
//! - [`ConnectionSessionOrchestrator`] is the facade callers use.

pub mod attempt;
pub mod controller;
pub mod deadline;
pub mod gauge;
pub mod orchestrator;
pub mod registry;
pub mod scheduler;
pub mod transition;

pub use attempt::SessionAttempt;
pub use controller::{HandshakeController, HandshakeTimings};
pub use gauge::LiveGauge;
pub use orchestrator::ConnectionSessionOrchestrator;
pub use registry::{ConnectionRegistry, RegistryEvent, DEFAULT_EVENT_BUFFER};
pub use scheduler::{PollHandle, PollingScheduler};
pub use transition::{AttemptEvent, Transition, TIMEOUT_REASON};
