//! Chat relay: entry point.
//!
//! This binary accepts WebSocket connections from browsers and relays every
//! chat message any client sends to every connected client, including the
//! sender.  There are no rooms, no history, and no authentication.
//!
//! # Usage
//!
//! ```text
//! relay-server [OPTIONS]
//!
//! Options:
//!   --bind            <IP>    Address to listen on [default: 0.0.0.0]
//!   --port            <PORT>  Port to listen on [default: 8000]
//!   --ws-path         <PATH>  WebSocket upgrade path [default: /ws]
//!   --queue-capacity  <N>     Broadcast queue capacity [default: 256]
//!   --send-timeout-ms <MS>    Per-recipient write timeout [default: 5000]
//!   --static-dir      <DIR>   Files served on every other path [default: ./public]
//!   --config          <FILE>  TOML file with any of the settings above
//! ```
//!
//! # Environment variable overrides
//!
//! Every option can also be set through the environment.  Precedence, lowest
//! to highest: built-in defaults, the `--config` file, then CLI/env values.
//!
//! | Variable                | Default   | Description                     |
//! |-------------------------|-----------|---------------------------------|
//! | `RELAY_BIND`            | `0.0.0.0` | Listen address                  |
//! | `RELAY_PORT`            | `8000`    | Listen port                     |
//! | `RELAY_WS_PATH`         | `/ws`     | WebSocket upgrade path          |
//! | `RELAY_QUEUE_CAPACITY`  | `256`     | Broadcast queue capacity        |
//! | `RELAY_SEND_TIMEOUT_MS` | `5000`    | Per-recipient write timeout     |
//! | `RELAY_STATIC_DIR`      | `./public`| Static files (the chat page)    |
//! | `RELAY_CONFIG`          | (none)    | Path to a TOML config file      |
//!
//! # Architecture overview
//!
//! ```text
//! Browsers  (chat page over HTTP, JSON chat messages over WebSocket)
//!       ↕
//! relay-server  ← this process
//!   domain/         RelayConfig, layered overrides
//!   application/    Frame → publish / ignore / disconnect
//!   infrastructure/
//!     ws_server/    Route upgrades and static files, run receive tasks
//!     ws_sink/      WebSocket write half as a MessageSink
//!       ↕
//! relay-core  (connection registry + single broadcast loop)
//! ```

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use relay_server::domain::{ConfigOverrides, RelayConfig};
use relay_server::infrastructure::run_server;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Real-time WebSocket chat relay.
///
/// Every option is optional so that a value left unset on the command line
/// can still come from the `--config` file.
#[derive(Debug, Parser)]
#[command(
    name = "relay-server",
    about = "Broadcast every chat message to every connected WebSocket client",
    version
)]
struct Cli {
    /// IP address to bind the listener to [default: 0.0.0.0].
    #[arg(long, env = "RELAY_BIND")]
    bind: Option<String>,

    /// TCP port to listen on [default: 8000].
    #[arg(long, env = "RELAY_PORT")]
    port: Option<u16>,

    /// Request path on which WebSocket upgrades are accepted [default: /ws].
    ///
    /// Every other path is served from `--static-dir`.
    #[arg(long, env = "RELAY_WS_PATH")]
    ws_path: Option<String>,

    /// Directory of static files (the chat page) [default: ./public].
    #[arg(long, env = "RELAY_STATIC_DIR")]
    static_dir: Option<PathBuf>,

    /// Capacity of the broadcast queue [default: 256].
    ///
    /// When the queue is full, receive tasks wait before reading their next
    /// frame.
    #[arg(long, env = "RELAY_QUEUE_CAPACITY")]
    queue_capacity: Option<usize>,

    /// Milliseconds a single recipient may take to accept a message before it
    /// is dropped [default: 5000].
    #[arg(long, env = "RELAY_SEND_TIMEOUT_MS")]
    send_timeout_ms: Option<u64>,

    /// Path to a TOML config file.
    #[arg(long, env = "RELAY_CONFIG")]
    config: Option<PathBuf>,
}

impl Cli {
    /// The subset of settings given on the command line or in the environment.
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            bind: self.bind.clone(),
            port: self.port,
            ws_path: self.ws_path.clone(),
            static_dir: self.static_dir.clone(),
            queue_capacity: self.queue_capacity,
            send_timeout_ms: self.send_timeout_ms,
        }
    }

    /// Builds the final [`RelayConfig`]: defaults, then the config file (if
    /// any), then CLI/env values.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed, if
    /// `--bind` is not an IP address, or if any resulting value is invalid.
    fn into_relay_config(self) -> anyhow::Result<RelayConfig> {
        let mut config = RelayConfig::default();

        if let Some(path) = &self.config {
            let file = ConfigOverrides::load(path)
                .with_context(|| format!("failed to load config file {}", path.display()))?;
            config = config.apply(&file)?;
        }

        let config = config.apply(&self.overrides())?;
        config.validate()?;
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// # What happens at startup
///
/// 1. `tracing_subscriber` is initialised; `RUST_LOG` controls the level
///    (default `info`).
/// 2. CLI arguments are parsed with `clap` and merged into a [`RelayConfig`].
/// 3. A Ctrl+C handler is spawned; it clears a shared `AtomicBool`.
/// 4. [`run_server`] binds the listener and serves until the flag is cleared.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging setup ─────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── Configuration ─────────────────────────────────────────────────────────
    let config = Cli::parse().into_relay_config()?;

    info!(
        "chat relay starting: bind={}, path={}, static={}, queue={}, send_timeout={:?}",
        config.bind_addr,
        config.ws_path,
        config.static_dir.display(),
        config.queue_capacity,
        config.send_timeout
    );

    // ── Graceful shutdown flag ────────────────────────────────────────────────
    //
    // `run_server` polls this flag every 200 ms.
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, shutting down");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    // ── Main server loop ──────────────────────────────────────────────────────
    run_server(config, running).await?;

    info!("chat relay stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
