// SPDX-FileCopyrightText: 2026 Relaydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection record CRUD.
//!
//! Enums are stored as their strum string form and timestamps as RFC 3339 text.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use relaydesk_core::{
    Connection, ConnectionId, ConnectionStatus, PlatformType, RelaydeskError,
};
use rusqlite::{params, Row};

use crate::database::{map_tr_err, Database};

const SELECT_COLUMNS: &str = "SELECT id, display_name, platform_type, status, is_default,
        last_error, retry_count, created_at, updated_at FROM connections";

fn conversion_err(
    column: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err))
}

fn parse_column<T>(row: &Row<'_>, column: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(column)?;
    raw.parse().map_err(|e| conversion_err(column, e))
}

fn parse_timestamp(row: &Row<'_>, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(column)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_err(column, e))
}

fn row_to_connection(row: &Row<'_>) -> rusqlite::Result<Connection> {
    Ok(Connection {
        id: ConnectionId(row.get(0)?),
        display_name: row.get(1)?,
        platform_type: parse_column::<PlatformType>(row, 2)?,
        status: parse_column::<ConnectionStatus>(row, 3)?,
        is_default: row.get(4)?,
        last_error: row.get(5)?,
        retry_count: row.get(6)?,
        created_at: parse_timestamp(row, 7)?,
        updated_at: parse_timestamp(row, 8)?,
    })
}

/// Load every connection, oldest first.
pub async fn list_connections(db: &Database) -> Result<Vec<Connection>, RelaydeskError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY created_at, id"))?;
            let rows = stmt.query_map([], row_to_connection)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Get a connection by ID.
pub async fn get_connection(
    db: &Database,
    id: &ConnectionId,
) -> Result<Option<Connection>, RelaydeskError> {
    let id = id.0.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} WHERE id = ?1"))?;
            match stmt.query_row(params![id], row_to_connection) {
                Ok(connection) => Ok(Some(connection)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Insert a new connection. A default connection clears the flag on all others.
pub async fn insert_connection(
    db: &Database,
    connection: &Connection,
) -> Result<(), RelaydeskError> {
    let c = connection.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            if c.is_default {
                tx.execute("UPDATE connections SET is_default = 0 WHERE is_default = 1", [])?;
            }
            tx.execute(
                "INSERT INTO connections (id, display_name, platform_type, status, is_default,
                     last_error, retry_count, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    c.id.0,
                    c.display_name,
                    c.platform_type.to_string(),
                    c.status.to_string(),
                    c.is_default,
                    c.last_error,
                    c.retry_count,
                    c.created_at.to_rfc3339(),
                    c.updated_at.to_rfc3339(),
                ],
            )?;
            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}

/// Overwrite the mutable fields of an existing connection.
///
/// Returns the number of rows touched (0 when the id is unknown).
pub async fn update_connection(
    db: &Database,
    connection: &Connection,
) -> Result<usize, RelaydeskError> {
    let c = connection.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            if c.is_default {
                tx.execute(
                    "UPDATE connections SET is_default = 0 WHERE is_default = 1 AND id <> ?1",
                    params![c.id.0],
                )?;
            }
            let changed = tx.execute(
                "UPDATE connections SET display_name = ?2, platform_type = ?3, status = ?4,
                     is_default = ?5, last_error = ?6, retry_count = ?7, updated_at = ?8
                 WHERE id = ?1",
                params![
                    c.id.0,
                    c.display_name,
                    c.platform_type.to_string(),
                    c.status.to_string(),
                    c.is_default,
                    c.last_error,
                    c.retry_count,
                    c.updated_at.to_rfc3339(),
                ],
            )?;
            tx.commit()?;
            Ok(changed)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete a connection. Missing ids are ignored.
pub async fn delete_connection(db: &Database, id: &ConnectionId) -> Result<(), RelaydeskError> {
    let id = id.0.clone();
    db.connection()
        .call(move |conn| {
            conn.execute("DELETE FROM connections WHERE id = ?1", params![id])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Make `id` the only default connection.
///
/// Returns `false` (and changes nothing) when the id is unknown.
pub async fn set_default_connection(
    db: &Database,
    id: &ConnectionId,
) -> Result<bool, RelaydeskError> {
    let id = id.0.clone();
    let now = Utc::now().to_rfc3339();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM connections WHERE id = ?1)",
                params![id],
                |row| row.get(0),
            )?;
            if !exists {
                return Ok(false);
            }
            tx.execute(
                "UPDATE connections SET is_default = 0, updated_at = ?2
                 WHERE is_default = 1 AND id <> ?1",
                params![id, now],
            )?;
            tx.execute(
                "UPDATE connections SET is_default = 1, updated_at = ?2 WHERE id = ?1",
                params![id, now],
            )?;
            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaydesk_core::ConnectionSpec;

    fn conn(id: &str, default: bool) -> Connection {
        let mut spec = ConnectionSpec::new(format!("Line {id}"), PlatformType::QrLinked).with_id(id);
        spec.is_default = default;
        Connection::from_spec(spec)
    }

    #[tokio::test]
    async fn insert_and_get_roundtrip() {
        let db = Database::open_in_memory().await.unwrap();
        let mut c = conn("c1", false);
        c.status = ConnectionStatus::Error;
        c.last_error = Some("timeout".into());
        c.retry_count = 2;
        insert_connection(&db, &c).await.unwrap();

        let loaded = get_connection(&db, &c.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, ConnectionStatus::Error);
        assert_eq!(loaded.last_error.as_deref(), Some("timeout"));
        assert_eq!(loaded.retry_count, 2);
        assert_eq!(loaded.platform_type, PlatformType::QrLinked);
        assert_eq!(loaded.created_at.timestamp_millis(), c.created_at.timestamp_millis());
    }

    #[tokio::test]
    async fn get_missing_returns_none() {
        let db = Database::open_in_memory().await.unwrap();
        assert!(get_connection(&db, &ConnectionId::from("nope")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn inserting_default_clears_previous_default() {
        let db = Database::open_in_memory().await.unwrap();
        insert_connection(&db, &conn("a", true)).await.unwrap();
        insert_connection(&db, &conn("b", true)).await.unwrap();

        let all = list_connections(&db).await.unwrap();
        let defaults: Vec<_> = all.iter().filter(|c| c.is_default).map(|c| c.id.0.as_str()).collect();
        assert_eq!(defaults, vec!["b"]);
    }

    #[tokio::test]
    async fn set_default_is_exclusive() {
        let db = Database::open_in_memory().await.unwrap();
        insert_connection(&db, &conn("a", true)).await.unwrap();
        insert_connection(&db, &conn("b", false)).await.unwrap();

        assert!(set_default_connection(&db, &ConnectionId::from("b")).await.unwrap());
        let all = list_connections(&db).await.unwrap();
        assert!(!all.iter().find(|c| c.id.0 == "a").unwrap().is_default);
        assert!(all.iter().find(|c| c.id.0 == "b").unwrap().is_default);

        assert!(!set_default_connection(&db, &ConnectionId::from("zzz")).await.unwrap());
        let after = list_connections(&db).await.unwrap();
        assert_eq!(after.iter().filter(|c| c.is_default).count(), 1);
    }

    #[tokio::test]
    async fn update_and_delete() {
        let db = Database::open_in_memory().await.unwrap();
        let mut c = conn("c1", false);
        insert_connection(&db, &c).await.unwrap();

        c.status = ConnectionStatus::Connected;
        c.display_name = "Renamed".into();
        assert_eq!(update_connection(&db, &c).await.unwrap(), 1);
        let loaded = get_connection(&db, &c.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, ConnectionStatus::Connected);
        assert_eq!(loaded.display_name, "Renamed");

        delete_connection(&db, &c.id).await.unwrap();
        delete_connection(&db, &c.id).await.unwrap();
        assert!(list_connections(&db).await.unwrap().is_empty());
        assert_eq!(update_connection(&db, &c).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn corrupt_enum_surfaces_as_storage_error() {
        let db = Database::open_in_memory().await.unwrap();
        insert_connection(&db, &conn("c1", false)).await.unwrap();
        db.connection()
            .call(|conn| conn.execute("UPDATE connections SET status = 'bogus'", []))
            .await
            .unwrap();
        let err = list_connections(&db).await.unwrap_err();
        assert!(matches!(err, RelaydeskError::Storage { .. }));
    }
}
