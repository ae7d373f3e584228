//! Inbound frame handling for one client connection.
//!
//! Each connection's receive task reads WebSocket frames one at a time and
//! asks [`classify_frame`] what to do with each:
//!
//! ```text
//! Text / Binary ──decode──► ok  → Publish(ChatMessage)
//!                           err → Disconnect(Malformed)
//! Ping / Pong ───────────────► Ignore
//! Close ──────────────────────► Disconnect(ClosedByPeer)
//! ```
//!
//! A malformed payload ends the connection: the relay does not try to
//! resynchronise with a client that sends something other than a chat
//! message.  Other clients are unaffected.
//!
//! This module is pure: no sockets, no async, no hub access.

use relay_core::{decode_message, decode_message_bytes, ChatMessage, CodecError};
use thiserror::Error;

/// A transport-neutral view of one inbound WebSocket frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundFrame<'a> {
    /// A text frame.
    Text(&'a str),
    /// A binary frame.  Clients may send the JSON object this way too.
    Binary(&'a [u8]),
    /// A protocol-level ping.  The WebSocket library answers it.
    Ping,
    /// A protocol-level pong.
    Pong,
    /// The client sent a Close frame.
    Close,
}

/// Why a connection's receive task stops.
#[derive(Debug, Error)]
pub enum DisconnectReason {
    /// The client closed the connection.
    #[error("client closed the connection")]
    ClosedByPeer,

    /// The client sent something that is not a chat message.
    #[error(transparent)]
    Malformed(#[from] CodecError),
}

/// What the receive task should do with a frame.
#[derive(Debug)]
pub enum InboundAction {
    /// Queue the message for broadcast.
    Publish(ChatMessage),
    /// Nothing to do; read the next frame.
    Ignore,
    /// Remove this connection from the registry and stop reading.
    Disconnect(DisconnectReason),
}

/// Decides what to do with one inbound frame.
///
/// # Example
///
/// ```rust
/// use relay_server::application::{classify_frame, InboundAction, InboundFrame};
///
/// let action = classify_frame(InboundFrame::Text(
///     r#"{"email":"a@x.com","username":"a","message":"hi"}"#,
/// ));
/// assert!(matches!(action, InboundAction::Publish(m) if m.message == "hi"));
/// ```
pub fn classify_frame(frame: InboundFrame<'_>) -> InboundAction {
    let decoded = match frame {
        InboundFrame::Text(text) => decode_message(text),
        InboundFrame::Binary(bytes) => decode_message_bytes(bytes),
        InboundFrame::Ping | InboundFrame::Pong => return InboundAction::Ignore,
        InboundFrame::Close => return InboundAction::Disconnect(DisconnectReason::ClosedByPeer),
    };

    match decoded {
        Ok(msg) => InboundAction::Publish(msg),
        Err(e) => InboundAction::Disconnect(DisconnectReason::Malformed(e)),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{"email":"a@x.com","username":"a","message":"hi"}"#;

    #[test]
    fn test_valid_text_frame_is_published() {
        let action = classify_frame(InboundFrame::Text(VALID));
        match action {
            InboundAction::Publish(msg) => {
                assert_eq!(msg, ChatMessage::new("a@x.com", "a", "hi"));
            }
            other => panic!("expected Publish, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_binary_frame_is_published() {
        let action = classify_frame(InboundFrame::Binary(VALID.as_bytes()));
        assert!(matches!(action, InboundAction::Publish(_)));
    }

    #[test]
    fn test_malformed_text_disconnects() {
        let action = classify_frame(InboundFrame::Text("not json"));
        assert!(matches!(
            action,
            InboundAction::Disconnect(DisconnectReason::Malformed(CodecError::Decode(_)))
        ));
    }

    #[test]
    fn test_missing_field_disconnects() {
        let action = classify_frame(InboundFrame::Text(r#"{"email":"a@x.com"}"#));
        assert!(matches!(
            action,
            InboundAction::Disconnect(DisconnectReason::Malformed(_))
        ));
    }

    #[test]
    fn test_non_utf8_binary_disconnects() {
        let action = classify_frame(InboundFrame::Binary(&[0xC3, 0x28]));
        assert!(matches!(
            action,
            InboundAction::Disconnect(DisconnectReason::Malformed(CodecError::InvalidUtf8))
        ));
    }

    #[test]
    fn test_control_frames_are_ignored() {
        for frame in [InboundFrame::Ping, InboundFrame::Pong] {
            assert!(matches!(classify_frame(frame), InboundAction::Ignore));
        }
    }

    #[test]
    fn test_close_frame_disconnects_as_closed_by_peer() {
        let action = classify_frame(InboundFrame::Close);
        assert!(matches!(
            action,
            InboundAction::Disconnect(DisconnectReason::ClosedByPeer)
        ));
    }

    #[test]
    fn test_disconnect_reason_display() {
        assert_eq!(
            DisconnectReason::ClosedByPeer.to_string(),
            "client closed the connection"
        );
        let malformed = DisconnectReason::from(CodecError::InvalidUtf8);
        assert_eq!(malformed.to_string(), "payload is not valid UTF-8");
    }
}
