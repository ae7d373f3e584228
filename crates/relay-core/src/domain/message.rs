//! The chat message value broadcast by the relay.

use serde::{Deserialize, Serialize};

/// One chat message published by a client.
///
/// A message has no identity, timestamp, or sequence number.  It is created by
/// decoding client input, consumed exactly once by the broadcast loop, and
/// encoded back out to every live connection.
///
/// # Serde representation
///
/// ```json
/// {"email":"a@x.com","username":"a","message":"hi"}
/// ```
///
/// All three fields are required when decoding.  Unknown extra fields are
/// ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Sender email address, as typed by the client.
    pub email: String,
    /// Sender display name.
    pub username: String,
    /// Message body text.
    pub message: String,
}

impl ChatMessage {
    /// Builds a message from its three fields.
    pub fn new(
        email: impl Into<String>,
        username: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            username: username.into(),
            message: message.into(),
        }
    }
}
