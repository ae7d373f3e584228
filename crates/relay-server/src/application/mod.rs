//! Application layer for relay-server.
//!
//! The application layer decides *what* to do with each frame a client sends;
//! the infrastructure layer does the I/O.
//!
//! # Responsibilities
//!
//! - Decoding inbound chat messages from text or binary frames
//! - Deciding whether a frame is published, ignored, or ends the connection
//!
//! # What does NOT belong here?
//!
//! - Opening sockets or listening for connections (that is infrastructure)
//! - Tokio task spawning (that happens in the infrastructure layer)
//! - WebSocket framing (handled by axum)

pub mod relay_service;

// Re-export so callers can write `application::classify_frame`.
pub use relay_service::{classify_frame, DisconnectReason, InboundAction, InboundFrame};
