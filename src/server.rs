//! Connection endpoint: accepts duplex connections and runs one session each
//!
//! Every accepted WebSocket gets its own [`Session`] on its own task; no two
//! pipelines share a connection and no mutable state is shared across
//! sessions. The endpoint performs no retries: one connection is one
//! conversation attempt.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::{
        Query, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
    routing::get,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::{Limits, VoiceMap};
use crate::gateway::Gateways;
use crate::pipeline::Session;
use crate::protocol::{OutboundControl, Transport, TransportEvent};
use crate::{Error, Result};

/// Baseline locale used when the connection omits the `lang` parameter
const DEFAULT_LANG: &str = "english";

/// Immutable process-wide state shared by all sessions
#[derive(Clone)]
pub struct AppState {
    pub gateways: Gateways,
    pub voices: VoiceMap,
    pub limits: Limits,
}

/// Query parameters for the converse endpoint
#[derive(Debug, Deserialize)]
struct ConverseQuery {
    lang: Option<String>,
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// The frame transport over an accepted axum WebSocket
pub struct WsTransport {
    socket: WebSocket,
}

impl WsTransport {
    #[must_use]
    pub fn new(socket: WebSocket) -> Self {
        Self { socket }
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn recv(&mut self) -> TransportEvent {
        loop {
            match self.socket.recv().await {
                Some(Ok(Message::Binary(frame))) => return TransportEvent::Audio(frame),
                Some(Ok(Message::Text(text))) => return TransportEvent::Text(text.to_string()),
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                    return TransportEvent::Closed;
                }
            }
        }
    }

    async fn send_control(&mut self, message: &OutboundControl) -> Result<()> {
        let json = serde_json::to_string(message)?;
        self.socket
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| Error::Transport(e.to_string()))
    }

    async fn send_audio(&mut self, chunk: Bytes) -> Result<()> {
        self.socket
            .send(Message::Binary(chunk))
            .await
            .map_err(|e| Error::Transport(e.to_string()))
    }

    async fn close(&mut self) {
        let _ = self.socket.send(Message::Close(None)).await;
    }
}

/// Build the router with the converse and health routes
pub fn router(state: Arc<AppState>) -> Router {
    // Permissive CORS: browser clients connect from arbitrary origins
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws/converse", get(converse_upgrade))
        .route("/health", get(health))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Health check
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Handle WebSocket upgrade for one conversation turn
async fn converse_upgrade(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConverseQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let lang = query
        .lang
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LANG.to_string());
    ws.on_upgrade(move |socket| handle_socket(socket, state, lang))
}

/// Run one session pipeline over an accepted socket
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, lang: String) {
    let mut session = Session::new(
        WsTransport::new(socket),
        &lang,
        state.gateways.clone(),
        state.voices.clone(),
        state.limits,
    );
    tracing::info!(id = %session.id(), lang = %lang, "connection accepted");
    session.run().await;
}

/// The conversation gateway server
pub struct GatewayServer {
    state: Arc<AppState>,
    port: u16,
}

impl GatewayServer {
    #[must_use]
    pub fn new(state: AppState, port: u16) -> Self {
        Self {
            state: Arc::new(state),
            port,
        }
    }

    /// Run the server until interrupted
    ///
    /// # Errors
    ///
    /// Returns error if the server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::Config(format!("failed to bind server: {e}")))?;

        tracing::info!(port = self.port, "gateway listening");

        axum::serve(listener, router(self.state))
            .await
            .map_err(|e| Error::Config(format!("server error: {e}")))?;

        Ok(())
    }
}
