//! Hub: the process-wide handle to the registry and the inbound queue.
//!
//! A [`Hub`] is built once at startup with [`Hub::new`], which also returns
//! the single [`BroadcastLoop`] that must be spawned to drain the queue.
//! Every connection task gets a clone of the hub and uses it to:
//!
//! - [`connect`](Hub::connect) its outbound sink after the upgrade,
//! - [`publish`](Hub::publish) each decoded message,
//! - [`disconnect`](Hub::disconnect) itself when its read side fails.
//!
//! When the last `Hub` clone is dropped the inbound queue closes and the
//! broadcast loop returns.
//!
//! ```text
//! Hub::new(config)
//!   ├── Hub ──clone──► connection task 1, 2, … N
//!   └── BroadcastLoop ──tokio::spawn──► run() until every Hub is dropped
//! ```

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::domain::connection::{ConnectionId, MessageSink};
use crate::domain::message::ChatMessage;
use crate::domain::registry::ConnectionRegistry;

mod broadcast_loop;

pub use broadcast_loop::{BroadcastLoop, BroadcastReport};

/// Default capacity of the inbound message queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Default upper bound on a single delivery.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors returned by [`Hub`] operations.
#[derive(Debug, Error, PartialEq)]
pub enum HubError {
    /// The broadcast loop has stopped, so nothing can be published.
    #[error("broadcast loop has stopped")]
    Closed,
}

/// Tuning knobs for the hub and its broadcast loop.
#[derive(Debug, Clone, PartialEq)]
pub struct HubConfig {
    /// Capacity of the bounded inbound queue.  Publishers wait when it is full.
    /// A value of `0` is treated as `1`.
    pub queue_capacity: usize,
    /// Maximum time a single delivery may take before the connection is
    /// treated as failed and pruned.
    pub send_timeout: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }
}

/// Shared handle to the connection registry and the inbound queue.
///
/// Cheap to clone: clones share the same registry and queue.
pub struct Hub<S: ?Sized + MessageSink> {
    registry: Arc<ConnectionRegistry<S>>,
    inbound_tx: mpsc::Sender<ChatMessage>,
    send_timeout: Duration,
}

impl<S: ?Sized + MessageSink> Clone for Hub<S> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            inbound_tx: self.inbound_tx.clone(),
            send_timeout: self.send_timeout,
        }
    }
}

impl<S: ?Sized + MessageSink> Hub<S> {
    /// Creates a hub and the broadcast loop that serves it.
    ///
    /// The caller must run the returned [`BroadcastLoop`] (usually with
    /// `tokio::spawn(broadcast_loop.run())`) or published messages will queue
    /// up and never be delivered.  [`Hub::start`] does both steps.
    pub fn new(config: HubConfig) -> (Self, BroadcastLoop<S>) {
        let (inbound_tx, inbound_rx) = mpsc::channel(config.queue_capacity.max(1));
        let registry = Arc::new(ConnectionRegistry::new());
        let broadcast_loop =
            BroadcastLoop::new(Arc::clone(&registry), inbound_rx, config.send_timeout);
        (
            Self {
                registry,
                inbound_tx,
                send_timeout: config.send_timeout,
            },
            broadcast_loop,
        )
    }

    /// Creates a hub and spawns its broadcast loop on the current Tokio runtime.
    pub fn start(config: HubConfig) -> (Self, JoinHandle<()>) {
        let (hub, broadcast_loop) = Self::new(config);
        let handle = tokio::spawn(broadcast_loop.run());
        (hub, handle)
    }

    /// Adds a newly upgraded connection to the broadcast audience.
    pub async fn connect(&self, sink: Arc<S>) -> ConnectionId {
        let id = self.registry.add(sink).await;
        debug!("connection {id} registered");
        id
    }

    /// Removes a connection and closes its sink.
    ///
    /// The close is bounded by the configured send timeout, so a peer that
    /// stopped reading cannot stall the caller.
    ///
    /// Returns `false` if the connection had already been removed (for
    /// example, pruned by the broadcast loop after a failed write); in that
    /// case the sink was closed by whoever removed it.
    pub async fn disconnect(&self, id: ConnectionId) -> bool {
        match self.registry.remove(id).await {
            Some(sink) => {
                close_bounded(id, sink.as_ref(), self.send_timeout).await;
                debug!("connection {id} unregistered");
                true
            }
            None => false,
        }
    }

    /// Queues a message for broadcast to every live connection.
    ///
    /// Waits while the inbound queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Closed`] if the broadcast loop is no longer running.
    pub async fn publish(&self, msg: ChatMessage) -> Result<(), HubError> {
        self.inbound_tx
            .send(msg)
            .await
            .map_err(|_| HubError::Closed)
    }

    /// Number of live connections.
    pub async fn connection_count(&self) -> usize {
        self.registry.len().await
    }

    /// Ids of every live connection at the time of the call.
    pub async fn connection_ids(&self) -> Vec<ConnectionId> {
        self.registry
            .snapshot()
            .await
            .into_iter()
            .map(|(id, _)| id)
            .collect()
    }

    /// Whether `id` is still in the broadcast audience.
    pub async fn is_connected(&self, id: ConnectionId) -> bool {
        self.registry.contains(id).await
    }

    pub(crate) fn registry(&self) -> &Arc<ConnectionRegistry<S>> {
        &self.registry
    }
}

/// Closes a sink that was just removed from the registry, giving up after
/// `limit`.
pub(crate) async fn close_bounded<S: ?Sized + MessageSink>(
    id: ConnectionId,
    sink: &S,
    limit: Duration,
) {
    if timeout(limit, sink.close()).await.is_err() {
        warn!("connection {id}: close timed out after {limit:?}");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
