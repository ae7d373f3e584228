//! HTTP server: WebSocket upgrades, static files, and per-connection tasks.
//!
//! This module is responsible for:
//!
//! 1. Binding a TCP listener on the configured address.
//! 2. Starting the [`Hub`] and its broadcast loop.
//! 3. Upgrading requests on the configured path to WebSocket sessions.
//! 4. Serving every other path from the static directory (the chat page).
//! 5. Registering each connection's write half with the hub.
//! 6. Running the connection's receive task: decode each frame and publish it,
//!    or disconnect on a malformed frame, a close, or a read error.
//! 7. Gracefully shutting down when the `running` flag is cleared.
//!
//! # Routing
//!
//! ```text
//! GET {ws_path}  ──► WebSocketUpgrade ──► run_connection
//! GET anything   ──► ServeDir(static_dir)   (404 when the file is missing)
//! ```
//!
//! # Failure isolation
//!
//! A failed upgrade is logged and only that connection is dropped.  The
//! server never exits because of one client.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use futures_util::future::join_all;
use futures_util::stream::SplitStream;
use futures_util::StreamExt;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tower_http::services::ServeDir;
use tracing::{debug, info, warn};

use relay_core::{ConnectionId, Hub, MessageSink};

use crate::application::{classify_frame, DisconnectReason, InboundAction, InboundFrame};
use crate::domain::config::RelayConfig;
use crate::infrastructure::ws_sink::WsSink;

/// The hub type used by the server: every sink is a WebSocket write half.
pub type RelayHub = Hub<WsSink>;

/// How often the server re-checks the shutdown flag.
const SHUTDOWN_POLL: Duration = Duration::from_millis(200);

/// How long shutdown waits for the broadcast loop to drain.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// State shared with every request handler.
#[derive(Clone)]
struct AppState {
    hub: RelayHub,
    running: Arc<AtomicBool>,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// A bound relay server, ready to accept connections.
///
/// Splitting [`bind`](RelayServer::bind) from [`run`](RelayServer::run) lets
/// callers (and tests) bind to port 0 and read the real address back before
/// serving starts.
pub struct RelayServer {
    listener: TcpListener,
    config: RelayConfig,
    hub: RelayHub,
    broadcast_task: JoinHandle<()>,
}

impl RelayServer {
    /// Binds the listener and starts the hub's broadcast loop.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or the TCP listener cannot
    /// be bound (e.g., the port is already in use).
    pub async fn bind(config: RelayConfig) -> anyhow::Result<Self> {
        config.validate().context("invalid relay configuration")?;

        let listener = TcpListener::bind(config.bind_addr)
            .await
            .with_context(|| format!("failed to bind listener on {}", config.bind_addr))?;

        let (hub, broadcast_task) = Hub::start(config.hub_config());

        Ok(Self {
            listener,
            config,
            hub,
            broadcast_task,
        })
    }

    /// The address the listener is actually bound to.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS cannot report the socket address.
    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("failed to read listener address")
    }

    /// The hub shared with every connection task.
    pub fn hub(&self) -> &RelayHub {
        &self.hub
    }

    /// Serves until `running` is set to `false`, then closes every live
    /// connection and waits briefly for the broadcast loop to stop.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP server fails on the listening socket.
    pub async fn run(self, running: Arc<AtomicBool>) -> anyhow::Result<()> {
        let Self {
            listener,
            config,
            hub,
            broadcast_task,
        } = self;

        if !config.static_dir.is_dir() {
            warn!(
                "static directory {} not found; only {} will answer",
                config.static_dir.display(),
                config.ws_path
            );
        }
        info!(
            "chat relay listening on http://{} (WebSocket at {}, files from {})",
            config.bind_addr,
            config.ws_path,
            config.static_dir.display()
        );

        let state = AppState {
            hub: hub.clone(),
            running: Arc::clone(&running),
        };
        let app = router(&config, state);

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(wait_for_shutdown(Arc::clone(&running), hub.clone()))
        .await
        .context("HTTP server failed")?;

        shutdown(hub, broadcast_task).await;
        Ok(())
    }
}

/// Binds and runs the relay until `running` is set to `false`.
///
/// # Errors
///
/// Returns an error if the config is invalid or the listener cannot be bound.
pub async fn run_server(config: RelayConfig, running: Arc<AtomicBool>) -> anyhow::Result<()> {
    RelayServer::bind(config).await?.run(running).await
}

fn router(config: &RelayConfig, state: AppState) -> Router {
    Router::new()
        .route(&config.ws_path, get(ws_handler))
        .fallback_service(ServeDir::new(&config.static_dir))
        .with_state(state)
}

// ── Shutdown ──────────────────────────────────────────────────────────────────

/// Resolves once `running` is cleared, after closing every live connection
/// so that upgraded sessions do not hold the server open.
async fn wait_for_shutdown(running: Arc<AtomicBool>, hub: RelayHub) {
    while running.load(Ordering::SeqCst) {
        sleep(SHUTDOWN_POLL).await;
    }
    info!("shutdown flag set; no longer accepting connections");
    close_all(&hub).await;
}

/// Closes whatever is still registered once the server has stopped, then
/// gives the broadcast loop a moment to finish.
async fn shutdown(hub: RelayHub, broadcast_task: JoinHandle<()>) {
    close_all(&hub).await;
    drop(hub);

    if timeout(SHUTDOWN_GRACE, broadcast_task).await.is_err() {
        warn!("broadcast loop still busy after {SHUTDOWN_GRACE:?}; exiting anyway");
    }
}

/// Disconnects every registered connection until none are left.
///
/// Runs until the registry is empty, so a connection registered while a pass
/// was in progress is caught by the next one.
async fn close_all<S: MessageSink>(hub: &Hub<S>) {
    loop {
        let ids = hub.connection_ids().await;
        if ids.is_empty() {
            return;
        }
        info!("closing {} live connection(s)", ids.len());
        join_all(ids.into_iter().map(|id| hub.disconnect(id))).await;
    }
}

// ── Per-connection handler ────────────────────────────────────────────────────

async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer_addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> Response {
    debug!("WebSocket upgrade request from {peer_addr}");
    ws.on_failed_upgrade(move |e| warn!("WebSocket upgrade from {peer_addr} failed: {e}"))
        .on_upgrade(move |socket| run_connection(socket, peer_addr, state))
}

/// Runs the complete lifecycle of one upgraded connection.
///
/// 1. Registers the write half with the hub (unless shutting down).
/// 2. Runs the receive task until the client leaves, misbehaves, or is
///    closed by the relay.
/// 3. Removes the connection from the hub.
///
/// Both socket halves are dropped on return, which releases the connection
/// even if the Close frame could not be flushed.
async fn run_connection(socket: WebSocket, peer_addr: SocketAddr, state: AppState) {
    let (ws_tx, ws_rx) = socket.split();
    let sink = Arc::new(WsSink::new(ws_tx));

    let Some(id) = admit(&state.hub, Arc::clone(&sink), &state.running).await else {
        debug!("connection from {peer_addr} arrived during shutdown; closed");
        return;
    };

    info!(
        "connection {id} opened from {peer_addr} ({} live)",
        state.hub.connection_count().await
    );

    let reason = receive_loop(id, &state.hub, &sink, ws_rx).await;

    // No-op if the broadcast loop already pruned it.
    state.hub.disconnect(id).await;

    info!(
        "connection {id} closed: {reason} ({} live)",
        state.hub.connection_count().await
    );
}

/// Adds `sink` to the hub, unless the server is shutting down.
///
/// The flag is checked after registering: shutdown clears the flag before it
/// drains the hub, so a connection either sees the flag or is drained.
async fn admit<S: MessageSink>(
    hub: &Hub<S>,
    sink: Arc<S>,
    running: &AtomicBool,
) -> Option<ConnectionId> {
    let id = hub.connect(sink).await;
    if running.load(Ordering::SeqCst) {
        return Some(id);
    }
    hub.disconnect(id).await;
    None
}

/// Why a receive task stopped, for the closing log line.
enum SessionEnd {
    Disconnected(DisconnectReason),
    StreamEnded,
    ReadError(axum::Error),
    ClosedByRelay,
    HubClosed,
}

impl std::fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionEnd::Disconnected(reason) => write!(f, "{reason}"),
            SessionEnd::StreamEnded => f.write_str("stream ended"),
            SessionEnd::ReadError(e) => write!(f, "read error: {e}"),
            SessionEnd::ClosedByRelay => f.write_str("closed by the relay"),
            SessionEnd::HubClosed => f.write_str("broadcast loop stopped"),
        }
    }
}

/// Reads frames from one client and publishes each decoded chat message.
async fn receive_loop(
    id: ConnectionId,
    hub: &RelayHub,
    sink: &WsSink,
    mut ws_rx: SplitStream<WebSocket>,
) -> SessionEnd {
    loop {
        let next = tokio::select! {
            next = ws_rx.next() => next,
            _ = sink.closed() => return SessionEnd::ClosedByRelay,
        };

        let ws_msg = match next {
            Some(Ok(msg)) => msg,
            Some(Err(e)) => return SessionEnd::ReadError(e),
            None => return SessionEnd::StreamEnded,
        };

        match classify_frame(inbound_frame(&ws_msg)) {
            InboundAction::Publish(msg) => {
                debug!("connection {id}: message from {}", msg.username);
                if hub.publish(msg).await.is_err() {
                    return SessionEnd::HubClosed;
                }
            }
            InboundAction::Ignore => {}
            InboundAction::Disconnect(reason) => {
                if let DisconnectReason::Malformed(e) = &reason {
                    warn!("connection {id}: {e}");
                }
                return SessionEnd::Disconnected(reason);
            }
        }
    }
}

/// Maps an axum WebSocket message onto the transport-neutral frame type.
fn inbound_frame(msg: &Message) -> InboundFrame<'_> {
    match msg {
        Message::Text(text) => InboundFrame::Text(text.as_str()),
        Message::Binary(bytes) => InboundFrame::Binary(bytes),
        Message::Ping(_) => InboundFrame::Ping,
        Message::Pong(_) => InboundFrame::Pong,
        Message::Close(_) => InboundFrame::Close,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
