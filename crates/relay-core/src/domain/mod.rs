//! Domain entities for the chat relay.
//!
//! This module contains the core types of the relay with no transport
//! dependencies.
//!
//! # What is "domain" in Clean Architecture? (for beginners)
//!
//! Clean Architecture organises code into concentric layers.  The innermost
//! layer is called the **domain**.  Domain code:
//!
//! - Contains the core rules of the application.
//! - Has **no** imports from network libraries, WebSocket frameworks, or UI
//!   code.
//! - Can be compiled and tested without any external setup.
//!
//! The relay's domain is small: a [`message::ChatMessage`] value, the identity
//! of a live connection, the [`connection::MessageSink`] trait that stands in
//! for "the outbound half of a client connection", and the
//! [`registry::ConnectionRegistry`] that tracks who is currently live.

/// Connection identity and the outbound delivery seam.
pub mod connection;

/// The chat message value.
pub mod message;

/// The set of live connections eligible for broadcast.
pub mod registry;
