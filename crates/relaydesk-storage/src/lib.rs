// SPDX-FileCopyrightText: 2026 Relaydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for Relaydesk.
//!
//! Provides WAL-mode SQLite storage with embedded migrations and a
//! single-writer concurrency model via `tokio-rusqlite`. The registry in
//! `relaydesk-session` is the only caller; it sees this crate through the
//! [`relaydesk_core::ConnectionStore`] trait.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteConnectionStore;
pub use database::Database;
