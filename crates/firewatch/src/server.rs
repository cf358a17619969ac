//! Gateway HTTP server.
//!
//! Builds the axum router (REST routes, the WebSocket push channel, and
//! health) around one [`AppState`], binds it, and runs it until the
//! root shutdown token fires.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::middleware;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use firewatch_config::{Config, ConfigError};
use firewatch_core::Engine;

use crate::auth::{self, SessionGate};
use crate::routes;
use crate::session::SessionManager;
use crate::ws;

/// Listener and routing settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    pub api_prefix: String,
    pub ws_path: String,
    pub send_queue: usize,
    pub heartbeat: Duration,
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 8080)),
            api_prefix: "/api".into(),
            ws_path: "/ws".into(),
            send_queue: 64,
            heartbeat: Duration::from_secs(30),
            cors_permissive: false,
        }
    }
}

impl ServerConfig {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let server = &config.server;
        Ok(Self {
            listen: config.listen_addr()?,
            api_prefix: server.api_prefix.clone(),
            ws_path: server.ws_path.clone(),
            send_queue: server.send_queue,
            heartbeat: Duration::from_secs(server.heartbeat_secs),
            cors_permissive: server.cors_permissive,
        })
    }
}

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<dyn Engine>,
    pub sessions: Arc<SessionManager>,
    pub gate: Arc<SessionGate>,
    pub heartbeat: Duration,
}

/// Build the router. Everything except `/health` sits behind the gate.
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    let gate = middleware::from_fn_with_state(Arc::clone(&state.gate), auth::require_token);

    let api = routes::api_router().route_layer(gate.clone());
    let router = Router::new()
        .route(&config.ws_path, get(ws::upgrade).route_layer(gate))
        .route("/health", get(routes::status::health));

    let router = match config.api_prefix.trim_end_matches('/') {
        "" => router.merge(api),
        prefix => router.nest(prefix, api),
    };

    let router = router
        .with_state(state)
        .layer(TraceLayer::new_for_http());
    if config.cors_permissive {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

/// Bind and start serving. The returned handle owns the server task.
pub async fn start(
    config: ServerConfig,
    engine: Arc<dyn Engine>,
    gate: SessionGate,
) -> Result<ServerHandle, std::io::Error> {
    let shutdown = CancellationToken::new();
    let sessions = Arc::new(SessionManager::new(config.send_queue, shutdown.clone()));
    let gate_enforced = gate.is_enforced();

    let state = AppState {
        engine,
        sessions: Arc::clone(&sessions),
        gate: Arc::new(gate),
        heartbeat: config.heartbeat,
    };
    let router = build_router(state, &config);

    let listener = TcpListener::bind(config.listen).await?;
    let addr = listener.local_addr()?;
    info!(
        %addr,
        api_prefix = %config.api_prefix,
        ws_path = %config.ws_path,
        gate = gate_enforced,
        "gateway listening"
    );

    let task = tokio::spawn(
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown.clone().cancelled_owned())
            .into_future(),
    );

    Ok(ServerHandle {
        addr,
        shutdown,
        sessions,
        task,
    })
}

/// Running gateway.
#[derive(Debug)]
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown: CancellationToken,
    sessions: Arc<SessionManager>,
    task: JoinHandle<std::io::Result<()>>,
}

impl ServerHandle {
    /// Bound address (the real port when listening on port 0).
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Root token. Cancelling it stops the server and every session.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Cancel every session and wait for the server to drain.
    pub async fn shutdown(self) -> std::io::Result<()> {
        info!(live_sessions = self.sessions.count(), "shutting down gateway");
        self.shutdown.cancel();
        self.wait().await
    }

    /// Wait for the server task to finish.
    pub async fn wait(self) -> std::io::Result<()> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(std::io::Error::other(e)),
        }
    }
}
