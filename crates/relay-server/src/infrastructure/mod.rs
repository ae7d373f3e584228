//! Infrastructure layer for relay-server.
//!
//! The infrastructure layer handles all I/O: serving HTTP, upgrading requests
//! to WebSocket sessions, and writing broadcast frames back out.
//!
//! # Responsibilities
//!
//! - Binding a TCP listener for browser connections
//! - Upgrading requests on the configured path to WebSocket sessions
//! - Serving the chat front-end from the static directory
//! - Adapting each WebSocket write half to the hub's `MessageSink` trait
//! - Spawning per-connection Tokio tasks
//! - Handling the graceful shutdown signal
//!
//! # What does NOT belong here?
//!
//! - Deciding what to do with a frame (that is the application layer)
//! - Configuration types (that is the domain layer)
//! - Fan-out and registry bookkeeping (that is `relay-core`)

pub mod ws_server;
pub mod ws_sink;

// Re-export the primary entry points so `main.rs` can call them concisely.
pub use ws_server::{run_server, RelayHub, RelayServer};
pub use ws_sink::{WsSink, WsWriter};
