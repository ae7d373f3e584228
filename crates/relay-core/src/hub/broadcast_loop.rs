//! BroadcastLoop: the single task that fans every queued message out to the
//! registry.
//!
//! # Steady state
//!
//! ```text
//! loop {
//!     msg = inbound_rx.recv().await      // the only blocking wait
//!     text = encode(msg)                 // once per message, not per recipient
//!     for (id, sink) in registry.snapshot() {
//!         timeout(send_timeout, sink.send_text(text))
//!             ok   → delivered
//!             fail → registry.remove(id), close (also bounded), log, keep going
//!     }
//! }
//! ```
//!
//! Messages are broadcast in queue order.  Within one broadcast, the order in
//! which recipients are tried is unspecified.  Failures are per-connection and
//! never stop the loop; there is no retry.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::domain::connection::{ConnectionId, DeliveryError, MessageSink};
use crate::domain::message::ChatMessage;
use crate::domain::registry::ConnectionRegistry;
use crate::hub::close_bounded;
use crate::protocol::codec::encode_message;

/// Outcome of broadcasting one message.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Number of connections the message was written to.
    pub delivered: usize,
    /// Connections whose delivery failed and that were pruned.
    pub pruned: Vec<ConnectionId>,
}

/// The serialized fan-out worker.  Create it with [`crate::Hub::new`].
pub struct BroadcastLoop<S: ?Sized + MessageSink> {
    registry: Arc<ConnectionRegistry<S>>,
    inbound_rx: mpsc::Receiver<ChatMessage>,
    send_timeout: Duration,
}

impl<S: ?Sized + MessageSink> BroadcastLoop<S> {
    pub(crate) fn new(
        registry: Arc<ConnectionRegistry<S>>,
        inbound_rx: mpsc::Receiver<ChatMessage>,
        send_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            inbound_rx,
            send_timeout,
        }
    }

    /// Drains the inbound queue until every [`crate::Hub`] handle is dropped.
    pub async fn run(mut self) {
        info!("broadcast loop started");

        while let Some(msg) = self.inbound_rx.recv().await {
            let report = self.broadcast(&msg).await;
            debug!(
                "broadcast from {}: delivered={}, pruned={}",
                msg.username,
                report.delivered,
                report.pruned.len()
            );
        }

        info!("broadcast loop stopped: inbound queue closed");
    }

    /// Delivers one message to every connection live when the call begins.
    ///
    /// Connections that fail are removed from the registry and closed before
    /// this returns.  Connections added while the broadcast is in progress do
    /// not receive this message.
    pub async fn broadcast(&self, msg: &ChatMessage) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        let text = match encode_message(msg) {
            Ok(text) => text,
            Err(e) => {
                error!("dropping message that could not be encoded: {e}");
                return report;
            }
        };

        for (id, sink) in self.registry.snapshot().await {
            match self.deliver(sink.as_ref(), &text).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!("connection {id}: delivery failed, removing: {e}");
                    // The receive task may have removed it first; whoever gets
                    // the sink back closes it.
                    if let Some(removed) = self.registry.remove(id).await {
                        close_bounded(id, removed.as_ref(), self.send_timeout).await;
                    }
                    report.pruned.push(id);
                }
            }
        }

        report
    }

    async fn deliver(&self, sink: &S, text: &str) -> Result<(), DeliveryError> {
        match timeout(self.send_timeout, sink.send_text(text)).await {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::Timeout(self.send_timeout)),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
