// SPDX-FileCopyrightText: 2026 Relaydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`PairingService`](relaydesk_core::PairingService) over a REST API.
//!
//! | Operation | Request |
//! |---|---|
//! | request pairing | `POST {base}/sessions/{id}` |
//! | check status | `GET {base}/sessions/{id}` |
//! | terminate | `DELETE {base}/sessions/{id}` |
//! | health | `GET {base}/health` |

pub mod client;

pub use client::HttpPairingService;
