//! ConnectionRegistry: the set of connections currently eligible for broadcast.
//!
//! The registry is the only shared mutable state in the relay.  Three kinds of
//! task touch it concurrently:
//!
//! - the accept path **adds** a connection after the WebSocket upgrade,
//! - a receive task **removes** its own connection when a read fails,
//! - the broadcast loop **removes** any connection whose write fails.
//!
//! All three go through one `RwLock`, so the map is never observed half
//! mutated.
//!
//! # Iterating while others remove
//!
//! The broadcast loop never iterates the map in place.  It takes a
//! [`snapshot`](ConnectionRegistry::snapshot) (a `Vec` of `Arc` handles copied
//! out under the read lock) and delivers from that copy with the lock
//! released.  Removals that happen mid-broadcast therefore cannot skip or
//! duplicate unrelated entries.
//!
//! # Who closes a removed connection?
//!
//! [`remove`](ConnectionRegistry::remove) returns the removed sink.  When a
//! read-side failure and a write-side failure race to remove the same
//! connection, only one of them gets `Some(sink)` back, and only that caller
//! closes it.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::domain::connection::{ConnectionId, MessageSink};

/// Thread-safe map from [`ConnectionId`] to the connection's outbound sink.
///
/// Entry existence is the only state: no per-connection metadata (name, room,
/// subscriptions) is tracked.
pub struct ConnectionRegistry<S: ?Sized + MessageSink> {
    connections: RwLock<HashMap<ConnectionId, Arc<S>>>,
}

impl<S: ?Sized + MessageSink> Default for ConnectionRegistry<S> {
    fn default() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }
}

impl<S: ?Sized + MessageSink> ConnectionRegistry<S> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new connection and returns its freshly assigned id.
    pub async fn add(&self, sink: Arc<S>) -> ConnectionId {
        let id = ConnectionId::new();
        self.insert(id, sink).await;
        id
    }

    /// Registers `sink` under a caller-chosen id.
    ///
    /// Returns `false` (and keeps the existing entry) if `id` is already live.
    pub async fn insert(&self, id: ConnectionId, sink: Arc<S>) -> bool {
        let mut connections = self.connections.write().await;
        if connections.contains_key(&id) {
            return false;
        }
        connections.insert(id, sink);
        true
    }

    /// Removes a connection from the live set.
    ///
    /// Returns the removed sink, or `None` if the id was not registered.
    /// Calling this twice for the same id is the same as calling it once.
    pub async fn remove(&self, id: ConnectionId) -> Option<Arc<S>> {
        self.connections.write().await.remove(&id)
    }

    /// Returns a point-in-time copy of every live connection.
    ///
    /// Order is unspecified.
    pub async fn snapshot(&self) -> Vec<(ConnectionId, Arc<S>)> {
        self.connections
            .read()
            .await
            .iter()
            .map(|(id, sink)| (*id, Arc::clone(sink)))
            .collect()
    }

    /// Returns `true` if `id` is currently live.
    pub async fn contains(&self, id: ConnectionId) -> bool {
        self.connections.read().await.contains_key(&id)
    }

    /// Number of live connections.
    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Returns `true` if no connection is live.
    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
