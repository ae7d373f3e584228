//! JSON codec for encoding and decoding chat messages.
//!
//! Wire format: one flat JSON object per WebSocket frame, no envelope.
//!
//! ```text
//! {"email":"<string>","username":"<string>","message":"<string>"}
//! ```
//!
//! Clients may send the object in a text frame or a binary frame; the relay
//! always replies with text frames.

use thiserror::Error;

use crate::domain::message::ChatMessage;

/// Errors that can occur during message encoding or decoding.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The payload is not a JSON object with the three required string fields.
    #[error("malformed chat message: {0}")]
    Decode(#[source] serde_json::Error),

    /// The message could not be serialized.
    #[error("failed to encode chat message: {0}")]
    Encode(#[source] serde_json::Error),

    /// A binary payload was not valid UTF-8.
    #[error("payload is not valid UTF-8")]
    InvalidUtf8,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes a [`ChatMessage`] into its JSON text form.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] if serialization fails.
///
/// # Examples
///
/// ```rust
/// use relay_core::{decode_message, encode_message, ChatMessage};
///
/// let msg = ChatMessage::new("a@x.com", "a", "hi");
/// let text = encode_message(&msg).unwrap();
/// assert_eq!(decode_message(&text).unwrap(), msg);
/// ```
pub fn encode_message(msg: &ChatMessage) -> Result<String, CodecError> {
    serde_json::to_string(msg).map_err(CodecError::Encode)
}

/// Decodes a [`ChatMessage`] from a text frame.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] if `text` is not a JSON object carrying
/// string `email`, `username` and `message` fields.
pub fn decode_message(text: &str) -> Result<ChatMessage, CodecError> {
    serde_json::from_str(text).map_err(CodecError::Decode)
}

/// Decodes a [`ChatMessage`] from a binary frame.
///
/// # Errors
///
/// Returns [`CodecError::InvalidUtf8`] for non-UTF-8 bytes and
/// [`CodecError::Decode`] for malformed JSON.
pub fn decode_message_bytes(bytes: &[u8]) -> Result<ChatMessage, CodecError> {
    let text = std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)?;
    decode_message(text)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_produces_exact_wire_shape() {
        let msg = ChatMessage::new("a@x.com", "a", "hi");
        let text = encode_message(&msg).unwrap();
        assert_eq!(text, r#"{"email":"a@x.com","username":"a","message":"hi"}"#);
    }

    #[test]
    fn test_decode_accepts_fields_in_any_order() {
        let msg = decode_message(r#"{"message":"hi","username":"a","email":"a@x.com"}"#).unwrap();
        assert_eq!(msg, ChatMessage::new("a@x.com", "a", "hi"));
    }

    #[test]
    fn test_decode_preserves_unicode_and_escapes() {
        let msg = decode_message(r#"{"email":"","username":"たろう","message":"line1\nline2 \"q\""}"#)
            .unwrap();
        assert_eq!(msg.username, "たろう");
        assert_eq!(msg.message, "line1\nline2 \"q\"");
        assert_eq!(msg.email, "");
    }

    #[test]
    fn test_decode_rejects_non_json() {
        let result = decode_message("hello there");
        assert!(matches!(result, Err(CodecError::Decode(_))));
    }

    #[test]
    fn test_decode_rejects_wrong_field_type() {
        let result = decode_message(r#"{"email":"a@x.com","username":"a","message":42}"#);
        assert!(matches!(result, Err(CodecError::Decode(_))));
    }

    #[test]
    fn test_decode_rejects_json_array() {
        let result = decode_message(r#"["a@x.com","a","hi"]"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_bytes_accepts_utf8_json() {
        let bytes = br#"{"email":"b@x.com","username":"b","message":"yo"}"#;
        let msg = decode_message_bytes(bytes).unwrap();
        assert_eq!(msg, ChatMessage::new("b@x.com", "b", "yo"));
    }

    #[test]
    fn test_decode_bytes_rejects_invalid_utf8() {
        let result = decode_message_bytes(&[0xFF, 0xFE, 0x7B]);
        assert!(matches!(result, Err(CodecError::InvalidUtf8)));
    }

    #[test]
    fn test_decode_error_display_mentions_malformed() {
        let err = decode_message("{").unwrap_err();
        assert!(err.to_string().starts_with("malformed chat message"));
    }
}
