//! [`MessageSink`] implementation over the write half of a WebSocket.
//!
//! The broadcast loop and the connection's own receive task both hold an
//! `Arc<WsSink>`.  Writes are serialized by a `tokio::sync::Mutex` around the
//! split sink.
//!
//! # Closing
//!
//! [`close`](MessageSink::close) marks the sink closed and wakes
//! [`WsSink::closed`] *before* it tries to send the Close frame.  Callers bound
//! `close` with a timeout, and a peer that stopped reading can stall the flush
//! indefinitely; marking first means the receive task still learns it was
//! dropped and releases the socket, even when the flush is abandoned.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{Sink, SinkExt};
use tokio::sync::{Mutex, Notify};
use tracing::debug;

use relay_core::{DeliveryError, MessageSink};

/// The write half produced by splitting an upgraded axum WebSocket.
pub type WsWriter = SplitSink<WebSocket, Message>;

/// Outbound half of one client's WebSocket.
pub struct WsSink<W = WsWriter> {
    writer: Mutex<W>,
    is_closed: AtomicBool,
    closed: Notify,
}

impl<W> WsSink<W>
where
    W: Sink<Message, Error = axum::Error> + Unpin + Send + 'static,
{
    /// Wraps the write half produced by `WebSocket::split`.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            is_closed: AtomicBool::new(false),
            closed: Notify::new(),
        }
    }

    /// Whether [`MessageSink::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.is_closed.load(Ordering::Acquire)
    }

    /// Resolves once [`MessageSink::close`] has been called on this sink.
    ///
    /// Resolves immediately if it already was.
    pub async fn closed(&self) {
        let notified = self.closed.notified();
        tokio::pin!(notified);
        // Register before checking the flag so a concurrent close cannot slip
        // between the check and the wait.
        notified.as_mut().enable();
        if self.is_closed() {
            return;
        }
        notified.await;
    }
}

#[async_trait]
impl<W> MessageSink for WsSink<W>
where
    W: Sink<Message, Error = axum::Error> + Unpin + Send + 'static,
{
    async fn send_text(&self, text: &str) -> Result<(), DeliveryError> {
        if self.is_closed() {
            return Err(DeliveryError::Closed);
        }
        let mut writer = self.writer.lock().await;
        writer
            .send(Message::Text(text.to_owned().into()))
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))
    }

    async fn close(&self) {
        if self.is_closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.closed.notify_waiters();

        let mut writer = self.writer.lock().await;
        if let Err(e) = writer.close().await {
            debug!("error while closing WebSocket: {e}");
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
