// SPDX-FileCopyrightText: 2026 Relaydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authoritative collection of connection records.
//!
//! Every mutation runs under one async mutex and is written through to the
//! optional [`ConnectionStore`] before the in-memory copy changes, so the
//! two never disagree and `set_default` cannot interleave with anything.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use chrono::Utc;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use relaydesk_core::{
    Connection, ConnectionId, ConnectionSpec, ConnectionStatus, ConnectionStore, RelaydeskError,
};

use crate::transition::UNKNOWN_ERROR_REASON;

/// Default capacity of the registry event channel.
pub const DEFAULT_EVENT_BUFFER: usize = 64;

/// Change notifications published by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    StatusChanged {
        id: ConnectionId,
        status: ConnectionStatus,
        last_error: Option<String>,
    },
    Removed {
        id: ConnectionId,
    },
}

/// Single-writer store of [`Connection`] records.
pub struct ConnectionRegistry {
    records: Arc<Mutex<HashMap<ConnectionId, Connection>>>,
    store: Option<Arc<dyn ConnectionStore>>,
    events: broadcast::Sender<RegistryEvent>,
}

impl ConnectionRegistry {
    /// A registry that keeps records in memory only.
    pub fn in_memory(event_buffer: usize) -> Self {
        let (events, _) = broadcast::channel(event_buffer.max(1));
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
            store: None,
            events,
        }
    }

    /// Load persisted connections from `store` and keep it in sync from now on.
    ///
    /// Records left mid-handshake by a previous process are reset to
    /// `Disconnected`; attempts do not survive a restart.
    pub async fn open(
        store: Arc<dyn ConnectionStore>,
        event_buffer: usize,
    ) -> Result<Self, RelaydeskError> {
        let mut records = HashMap::new();
        for mut connection in store.load_all().await? {
            if connection.status.is_transient() {
                info!(
                    connection_id = %connection.id,
                    status = %connection.status,
                    "resetting interrupted handshake"
                );
                connection.status = ConnectionStatus::Disconnected;
                connection.last_error = None;
                connection.updated_at = Utc::now();
                store.update(&connection).await?;
            }
            records.insert(connection.id.clone(), connection);
        }
        debug!(count = records.len(), "connection registry loaded");

        let (events, _) = broadcast::channel(event_buffer.max(1));
        Ok(Self {
            records: Arc::new(Mutex::new(records)),
            store: Some(store),
            events,
        })
    }

    /// Create a `Disconnected` connection. A default connection takes the
    /// flag away from every other record.
    pub async fn create(&self, spec: ConnectionSpec) -> Result<Connection, RelaydeskError> {
        let connection = Connection::from_spec(spec);
        let mut records = self.records.lock().await;
        if records.contains_key(&connection.id) {
            return Err(RelaydeskError::AlreadyExists {
                connection_id: connection.id,
            });
        }
        if let Some(store) = &self.store {
            store.insert(&connection).await?;
        }
        if connection.is_default {
            clear_default(&mut records, None);
        }
        records.insert(connection.id.clone(), connection.clone());
        info!(
            connection_id = %connection.id,
            platform = %connection.platform_type,
            "connection created"
        );
        Ok(connection)
    }

    /// Remove a connection and end its status streams.
    pub async fn delete(&self, id: &ConnectionId) -> Result<(), RelaydeskError> {
        let mut records = self.records.lock().await;
        if !records.contains_key(id) {
            return Err(RelaydeskError::not_found(id));
        }
        if let Some(store) = &self.store {
            store.delete(id).await?;
        }
        records.remove(id);
        let _ = self.events.send(RegistryEvent::Removed { id: id.clone() });
        info!(connection_id = %id, "connection deleted");
        Ok(())
    }

    /// All connections, oldest first.
    pub async fn list(&self) -> Vec<Connection> {
        let records = self.records.lock().await;
        let mut all: Vec<Connection> = records.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        all
    }

    pub async fn get(&self, id: &ConnectionId) -> Result<Connection, RelaydeskError> {
        self.records
            .lock()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| RelaydeskError::not_found(id))
    }

    /// The connection currently flagged as default, if any.
    pub async fn default_connection(&self) -> Option<Connection> {
        self.records
            .lock()
            .await
            .values()
            .find(|c| c.is_default)
            .cloned()
    }

    /// Make `id` the only default connection.
    pub async fn set_default(&self, id: &ConnectionId) -> Result<Connection, RelaydeskError> {
        let mut records = self.records.lock().await;
        if !records.contains_key(id) {
            return Err(RelaydeskError::not_found(id));
        }
        if let Some(store) = &self.store {
            store.set_default(id).await?;
        }
        clear_default(&mut records, Some(id));
        let record = records
            .get_mut(id)
            .ok_or_else(|| RelaydeskError::not_found(id))?;
        if !record.is_default {
            record.is_default = true;
            record.updated_at = Utc::now();
        }
        info!(connection_id = %id, "default connection changed");
        Ok(record.clone())
    }

    /// Record a status change for `id`.
    ///
    /// Entering `Connecting` counts a new attempt in `retry_count`; reaching
    /// `Connected` resets it. `last_error` is kept only for `Error`.
    pub async fn apply_status(
        &self,
        id: &ConnectionId,
        status: ConnectionStatus,
        last_error: Option<String>,
    ) -> Result<Connection, RelaydeskError> {
        let mut records = self.records.lock().await;
        let current = records.get(id).ok_or_else(|| RelaydeskError::not_found(id))?;

        let mut next = current.clone();
        match status {
            ConnectionStatus::Connecting => next.retry_count = next.retry_count.saturating_add(1),
            ConnectionStatus::Connected => next.retry_count = 0,
            _ => {}
        }
        next.status = status;
        next.last_error = match status {
            ConnectionStatus::Error => {
                Some(last_error.unwrap_or_else(|| UNKNOWN_ERROR_REASON.to_string()))
            }
            _ => None,
        };
        next.updated_at = Utc::now();

        if let Some(store) = &self.store {
            store.update(&next).await?;
        }
        records.insert(id.clone(), next.clone());
        debug!(
            connection_id = %id,
            status = %next.status,
            retry_count = next.retry_count,
            "status applied"
        );
        let _ = self.events.send(RegistryEvent::StatusChanged {
            id: id.clone(),
            status: next.status,
            last_error: next.last_error.clone(),
        });
        Ok(next)
    }

    /// Subscribe to every registry event.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }

    /// Stream of `id`'s status: the current value first, then each change.
    ///
    /// A subscriber that falls behind the event buffer resynchronizes from
    /// the records, so the latest status is always delivered. Ends when the
    /// connection is deleted or the registry goes away.
    pub async fn status_stream(
        &self,
        id: &ConnectionId,
    ) -> Result<BoxStream<'static, ConnectionStatus>, RelaydeskError> {
        // Subscribe under the lock so no change between the snapshot and
        // the subscription is lost.
        let records = self.records.lock().await;
        let current = records
            .get(id)
            .map(|c| c.status)
            .ok_or_else(|| RelaydeskError::not_found(id))?;
        let rx = self.events.subscribe();
        drop(records);

        let state = StreamState {
            id: id.clone(),
            first: Some(current),
            last: current,
            rx,
            records: Arc::downgrade(&self.records),
        };
        Ok(stream::unfold(state, next_status).boxed())
    }
}

struct StreamState {
    id: ConnectionId,
    first: Option<ConnectionStatus>,
    /// Last status handed to the consumer.
    last: ConnectionStatus,
    rx: broadcast::Receiver<RegistryEvent>,
    records: Weak<Mutex<HashMap<ConnectionId, Connection>>>,
}

async fn next_status(mut state: StreamState) -> Option<(ConnectionStatus, StreamState)> {
    if let Some(first) = state.first.take() {
        return Some((first, state));
    }
    loop {
        match state.rx.recv().await {
            Ok(RegistryEvent::StatusChanged { id, status, .. }) if id == state.id => {
                state.last = status;
                return Some((status, state));
            }
            Ok(RegistryEvent::Removed { id }) if id == state.id => return None,
            Ok(_) => continue,
            Err(RecvError::Lagged(skipped)) => {
                warn!(connection_id = %state.id, skipped, "status stream lagged, resynchronizing");
                let current = resync(&mut state).await?;
                if current != state.last {
                    state.last = current;
                    return Some((current, state));
                }
            }
            Err(RecvError::Closed) => return None,
        }
    }
}

/// Replace a lagged receiver with one positioned after the current records.
///
/// Events are only published while the records lock is held, so the fresh
/// receiver and the snapshot form a consistent cut. Returns `None` when the
/// connection or the registry is gone.
async fn resync(state: &mut StreamState) -> Option<ConnectionStatus> {
    let records = state.records.upgrade()?;
    let records = records.lock().await;
    state.rx = state.rx.resubscribe();
    records.get(&state.id).map(|c| c.status)
}

fn clear_default(records: &mut HashMap<ConnectionId, Connection>, keep: Option<&ConnectionId>) {
    let now = Utc::now();
    for record in records.values_mut() {
        if record.is_default && Some(&record.id) != keep {
            record.is_default = false;
            record.updated_at = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaydesk_core::PlatformType;

    fn qr(id: &str) -> ConnectionSpec {
        ConnectionSpec::new(format!("Line {id}"), PlatformType::QrLinked).with_id(id)
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let registry = ConnectionRegistry::in_memory(DEFAULT_EVENT_BUFFER);
        let ghost = ConnectionId::from("ghost");
        assert!(matches!(registry.get(&ghost).await, Err(RelaydeskError::NotFound { .. })));
        assert!(matches!(registry.delete(&ghost).await, Err(RelaydeskError::NotFound { .. })));
        assert!(matches!(
            registry.set_default(&ghost).await,
            Err(RelaydeskError::NotFound { .. })
        ));
        assert!(matches!(
            registry
                .apply_status(&ghost, ConnectionStatus::Connected, None)
                .await,
            Err(RelaydeskError::NotFound { .. })
        ));
        assert!(registry.status_stream(&ghost).await.is_err());
    }

    #[tokio::test]
    async fn duplicate_id_rejected() {
        let registry = ConnectionRegistry::in_memory(DEFAULT_EVENT_BUFFER);
        registry.create(qr("c1")).await.unwrap();
        assert!(matches!(
            registry.create(qr("c1")).await,
            Err(RelaydeskError::AlreadyExists { .. })
        ));
    }

    #[tokio::test]
    async fn set_default_moves_the_flag() {
        let registry = ConnectionRegistry::in_memory(DEFAULT_EVENT_BUFFER);
        registry.create(qr("a").as_default()).await.unwrap();
        registry.create(qr("b")).await.unwrap();
        registry.set_default(&ConnectionId::from("b")).await.unwrap();

        let defaults: Vec<_> = registry
            .list()
            .await
            .into_iter()
            .filter(|c| c.is_default)
            .map(|c| c.id)
            .collect();
        assert_eq!(defaults, vec![ConnectionId::from("b")]);
        assert_eq!(
            registry.default_connection().await.map(|c| c.id),
            Some(ConnectionId::from("b"))
        );
    }

    #[tokio::test]
    async fn retry_count_and_last_error_rules() {
        let registry = ConnectionRegistry::in_memory(DEFAULT_EVENT_BUFFER);
        let id = registry.create(qr("c1")).await.unwrap().id;

        registry
            .apply_status(&id, ConnectionStatus::Connecting, None)
            .await
            .unwrap();
        let failed = registry
            .apply_status(&id, ConnectionStatus::Error, Some("rejected".into()))
            .await
            .unwrap();
        assert_eq!(failed.retry_count, 1);
        assert_eq!(failed.last_error.as_deref(), Some("rejected"));

        let retry = registry
            .apply_status(&id, ConnectionStatus::Connecting, Some("ignored".into()))
            .await
            .unwrap();
        assert_eq!(retry.retry_count, 2);
        assert!(retry.last_error.is_none());

        let done = registry
            .apply_status(&id, ConnectionStatus::Connected, None)
            .await
            .unwrap();
        assert_eq!(done.retry_count, 0);
        assert!(done.updated_at >= done.created_at);
    }

    #[tokio::test]
    async fn error_without_reason_gets_placeholder() {
        let registry = ConnectionRegistry::in_memory(DEFAULT_EVENT_BUFFER);
        let id = registry.create(qr("c1")).await.unwrap().id;
        let c = registry
            .apply_status(&id, ConnectionStatus::Error, None)
            .await
            .unwrap();
        assert_eq!(c.last_error.as_deref(), Some(UNKNOWN_ERROR_REASON));
    }

    #[tokio::test]
    async fn status_stream_yields_current_then_changes_then_ends_on_delete() {
        let registry = ConnectionRegistry::in_memory(DEFAULT_EVENT_BUFFER);
        let a = registry.create(qr("a")).await.unwrap().id;
        let b = registry.create(qr("b")).await.unwrap().id;
        let mut stream = registry.status_stream(&a).await.unwrap();

        registry
            .apply_status(&b, ConnectionStatus::Connecting, None)
            .await
            .unwrap();
        registry
            .apply_status(&a, ConnectionStatus::Connecting, None)
            .await
            .unwrap();
        registry.delete(&a).await.unwrap();

        let seen: Vec<_> = stream.by_ref().collect().await;
        assert_eq!(
            seen,
            vec![ConnectionStatus::Disconnected, ConnectionStatus::Connecting]
        );
    }

    #[tokio::test]
    async fn lagged_stream_resyncs_to_latest_status() {
        let registry = ConnectionRegistry::in_memory(2);
        let a = registry.create(qr("a")).await.unwrap().id;
        let b = registry.create(qr("b")).await.unwrap().id;
        registry
            .apply_status(&a, ConnectionStatus::AwaitingConfirmation, None)
            .await
            .unwrap();
        let mut stream = registry.status_stream(&a).await.unwrap();
        assert_eq!(stream.next().await, Some(ConnectionStatus::AwaitingConfirmation));

        registry
            .apply_status(&a, ConnectionStatus::Connected, None)
            .await
            .unwrap();
        for status in [
            ConnectionStatus::Connecting,
            ConnectionStatus::AwaitingConfirmation,
            ConnectionStatus::Disconnected,
        ] {
            registry.apply_status(&b, status, None).await.unwrap();
        }

        assert_eq!(stream.next().await, Some(ConnectionStatus::Connected));

        registry
            .apply_status(&a, ConnectionStatus::Error, Some("revoked".into()))
            .await
            .unwrap();
        assert_eq!(stream.next().await, Some(ConnectionStatus::Error));
    }

    #[tokio::test]
    async fn lagged_stream_ends_when_connection_was_deleted() {
        let registry = ConnectionRegistry::in_memory(1);
        let a = registry.create(qr("a")).await.unwrap().id;
        let b = registry.create(qr("b")).await.unwrap().id;
        let mut stream = registry.status_stream(&a).await.unwrap();
        assert_eq!(stream.next().await, Some(ConnectionStatus::Disconnected));

        registry.delete(&a).await.unwrap();
        registry
            .apply_status(&b, ConnectionStatus::Connecting, None)
            .await
            .unwrap();
        registry
            .apply_status(&b, ConnectionStatus::AwaitingConfirmation, None)
            .await
            .unwrap();

        assert_eq!(stream.next().await, None);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Create { id: u8, default: bool },
            SetDefault(u8),
            Delete(u8),
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                (0u8..6, any::<bool>()).prop_map(|(id, default)| Op::Create { id, default }),
                (0u8..6).prop_map(Op::SetDefault),
                (0u8..6).prop_map(Op::Delete),
            ]
        }

        proptest! {
            #[test]
            fn at_most_one_default(ops in proptest::collection::vec(op(), 1..40)) {
                let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
                rt.block_on(async {
                    let registry = ConnectionRegistry::in_memory(DEFAULT_EVENT_BUFFER);
                    for op in ops {
                        let _ = match op {
                            Op::Create { id, default } => {
                                let mut spec = qr(&format!("c{id}"));
                                spec.is_default = default;
                                registry.create(spec).await.map(|_| ())
                            }
                            Op::SetDefault(id) => registry
                                .set_default(&ConnectionId(format!("c{id}")))
                                .await
                                .map(|_| ()),
                            Op::Delete(id) => registry.delete(&ConnectionId(format!("c{id}"))).await,
                        };
                        let defaults = registry.list().await.iter().filter(|c| c.is_default).count();
                        assert!(defaults <= 1, "{defaults} defaults");
                    }
                });
            }
        }
    }
}
