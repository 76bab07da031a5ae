// SPDX-FileCopyrightText: 2026 Relaydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the ConnectionStore trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use relaydesk_config::model::StorageConfig;
use relaydesk_core::{
    AdapterType, Connection, ConnectionId, ConnectionStore, HealthStatus, PluginAdapter,
    RelaydeskError,
};

use crate::database::{map_tr_err, Database};
use crate::queries;

/// SQLite-backed connection store.
///
/// The database is opened lazily by [`ConnectionStore::initialize`].
pub struct SqliteConnectionStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteConnectionStore {
    /// Create a store for the configured path without opening it.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Wrap an already opened database.
    pub fn with_database(config: StorageConfig, db: Database) -> Self {
        Self {
            config,
            db: OnceCell::new_with(Some(db)),
        }
    }

    fn db(&self) -> Result<&Database, RelaydeskError> {
        self.db.get().ok_or_else(|| RelaydeskError::Storage {
            source: "connection store not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteConnectionStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, RelaydeskError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RelaydeskError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl ConnectionStore for SqliteConnectionStore {
    async fn initialize(&self) -> Result<(), RelaydeskError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| RelaydeskError::Storage {
            source: "connection store already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite connection store initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), RelaydeskError> {
        self.db()?.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<Connection>, RelaydeskError> {
        queries::connections::list_connections(self.db()?).await
    }

    async fn insert(&self, connection: &Connection) -> Result<(), RelaydeskError> {
        queries::connections::insert_connection(self.db()?, connection).await
    }

    async fn update(&self, connection: &Connection) -> Result<(), RelaydeskError> {
        let changed = queries::connections::update_connection(self.db()?, connection).await?;
        if changed == 0 {
            return Err(RelaydeskError::not_found(&connection.id));
        }
        Ok(())
    }

    async fn delete(&self, id: &ConnectionId) -> Result<(), RelaydeskError> {
        queries::connections::delete_connection(self.db()?, id).await
    }

    async fn set_default(&self, id: &ConnectionId) -> Result<(), RelaydeskError> {
        if queries::connections::set_default_connection(self.db()?, id).await? {
            Ok(())
        } else {
            Err(RelaydeskError::not_found(id))
        }
    }
}
