// SPDX-FileCopyrightText: 2026 Relaydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Relaydesk integration tests.
//!
//! # Components
//!
//! - [`MockPairingService`] - scriptable pairing service with per-answer delays
//! - [`TestHarness`] - registry + orchestrator wired to the mock

pub mod harness;
pub mod mock_pairing;

pub use harness::{qr_spec, TestHarness};
pub use mock_pairing::MockPairingService;
