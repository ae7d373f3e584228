//! # relay-core
//!
//! Shared library for the chat relay containing the chat message type, the
//! JSON wire codec, the connection registry, and the broadcast hub.
//!
//! This crate has no dependencies on sockets or WebSocket libraries.  The
//! transport is plugged in through the [`MessageSink`] trait, so everything
//! here can be tested with in-memory sinks.
//!
//! # Architecture overview (for beginners)
//!
//! The relay is a chat room: any connected client may publish a message, and
//! every connected client (including the publisher) receives every published
//! message in the order the relay processes them.
//!
//! ```text
//! receive task (client 1) ─┐
//! receive task (client 2) ─┼─► inbound queue ─► BroadcastLoop ─► every sink in the Registry
//! receive task (client N) ─┘
//! ```
//!
//! - **`domain`** – The [`ChatMessage`] value, connection identity, the
//!   outbound [`MessageSink`] seam, and the thread-safe [`ConnectionRegistry`].
//!
//! - **`protocol`** – How a `ChatMessage` travels on the wire: one flat JSON
//!   object with `email`, `username` and `message` fields.
//!
//! - **`hub`** – The [`Hub`] handle shared by every connection task and the
//!   single [`BroadcastLoop`] task that drains the inbound queue and fans each
//!   message out to the registry.

pub mod domain;
pub mod hub;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `relay_core::Hub` instead of `relay_core::hub::Hub`.
pub use domain::connection::{ConnectionId, DeliveryError, MessageSink};
pub use domain::message::ChatMessage;
pub use domain::registry::ConnectionRegistry;
pub use hub::{BroadcastLoop, BroadcastReport, Hub, HubConfig, HubError};
pub use protocol::codec::{decode_message, decode_message_bytes, encode_message, CodecError};
