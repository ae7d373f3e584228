//! relay-server library crate.
//!
//! This crate serves the chat relay over WebSocket: browsers connect, publish
//! chat messages as JSON, and receive every message published by anyone.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Browser (JSON over WebSocket)
//!         ↕
//! [relay-server]
//!   ├── domain/           RelayConfig and config-file loading
//!   ├── application/      Classify inbound frames: publish, ignore, or disconnect
//!   └── infrastructure/
//!         ├── ws_server/  Router (upgrade + static files), per-connection receive task
//!         └── ws_sink/    MessageSink over the WebSocket write half
//!         ↕
//! [relay-core]  Hub → ConnectionRegistry + BroadcastLoop
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no network dependencies.
//! - `application` depends on `domain` and `relay-core` only.
//! - `infrastructure` depends on all other layers plus `tokio`, `axum` and `tower-http`.

/// Domain layer: configuration types (no I/O beyond reading the config file).
pub mod domain;

/// Application layer: inbound frame handling.
pub mod application;

/// Infrastructure layer: HTTP/WebSocket server and WebSocket-backed sink.
pub mod infrastructure;
