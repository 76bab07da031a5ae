// SPDX-FileCopyrightText: 2026 Relaydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence trait backing the connection registry.

use async_trait::async_trait;

use crate::error::RelaydeskError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Connection, ConnectionId};

/// Durable storage for connection records.
///
/// The registry is the only writer and serializes every call, so
/// implementations do not need their own cross-call locking.
#[async_trait]
pub trait ConnectionStore: PluginAdapter {
    /// Initializes the backend (migrations, connection handle, etc.).
    async fn initialize(&self) -> Result<(), RelaydeskError>;

    /// Flushes pending writes and releases the backend.
    async fn close(&self) -> Result<(), RelaydeskError>;

    /// Loads every persisted connection, oldest first.
    async fn load_all(&self) -> Result<Vec<Connection>, RelaydeskError>;

    /// Inserts a new record.
    async fn insert(&self, connection: &Connection) -> Result<(), RelaydeskError>;

    /// Overwrites an existing record.
    async fn update(&self, connection: &Connection) -> Result<(), RelaydeskError>;

    /// Deletes a record. Deleting a missing id is not an error.
    async fn delete(&self, id: &ConnectionId) -> Result<(), RelaydeskError>;

    /// Marks `id` as the only default connection in a single transaction.
    async fn set_default(&self, id: &ConnectionId) -> Result<(), RelaydeskError>;
}
