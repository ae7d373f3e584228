//! Protocol module containing the JSON wire codec for chat messages.

pub mod codec;

pub use codec::{decode_message, decode_message_bytes, encode_message, CodecError};
