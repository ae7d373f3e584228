//! Domain layer for relay-server.
//!
//! The relay's message types live in `relay-core`; what remains here is the
//! runtime configuration of the server process.
//!
//! # What does NOT belong here?
//!
//! - Any `tokio`, `TcpStream`, or `WebSocket` types
//! - Environment variable or CLI parsing (that is done in `main.rs`)

pub mod config;

// Re-export so callers can write `domain::RelayConfig`.
pub use config::{ConfigError, ConfigOverrides, RelayConfig};
