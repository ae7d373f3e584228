//! Connection identity and the outbound delivery seam.
//!
//! The relay core never touches a socket.  Each live client is represented by
//! a [`ConnectionId`] and a shared [`MessageSink`] that knows how to push a
//! text frame to that client.  The WebSocket server provides the real sink;
//! tests provide in-memory ones.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// Unique identity of one live client connection.
///
/// Assigned by the registry when the connection is added.  The id is never
/// reused, so a late removal for a connection that already left cannot hit a
/// newer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generates a fresh random connection id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The short form keeps log lines readable.
        let s = self.0.simple().to_string();
        f.write_str(&s[..8])
    }
}

/// Errors returned when a message cannot be delivered to one connection.
///
/// Every variant is connection-scoped: the broadcast loop prunes the failing
/// connection and carries on with the others.
#[derive(Debug, Error, PartialEq)]
pub enum DeliveryError {
    /// The connection was already closed.
    #[error("connection closed")]
    Closed,

    /// The transport reported a write failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The write did not complete within the configured delivery timeout.
    #[error("delivery timed out after {0:?}")]
    Timeout(Duration),
}

/// The outbound half of one client connection.
///
/// # Contract
///
/// - `send_text` writes one complete text frame.  It may suspend for the
///   duration of the write.
/// - `close` tears the channel down.  The registry hands each removed sink to
///   exactly one caller, so `close` is called at most once per connection by
///   the relay core.
#[async_trait]
pub trait MessageSink: Send + Sync + 'static {
    /// Sends one encoded chat message as a single text frame.
    async fn send_text(&self, text: &str) -> Result<(), DeliveryError>;

    /// Closes the underlying channel.  Errors while closing are swallowed.
    async fn close(&self);
}
