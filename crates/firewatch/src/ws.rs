// ── Dashboard push channel ──
//
// One WebSocket per dashboard client. The socket is split into a writer
// (relayed entries, replies, heartbeat pings) and a reader (client
// messages). Either side finishing tears the whole connection down and
// cancels the engine subscription behind it.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::{IntoResponse, Response};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use firewatch_core::{LogEntry, SessionEnd, SessionId, StreamSession};

use crate::protocol::{ClientMessage, ServerMessage};
use crate::routes::error::ApiError;
use crate::server::AppState;

/// Replies queued by the reader for the writer.
const CONTROL_QUEUE: usize = 8;

/// WebSocket upgrade handler.
pub async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    if state.sessions.is_shutting_down() {
        return ApiError::new(
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            "shutting_down",
            "gateway is shutting down",
        )
        .into_response();
    }
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let (id, cancel) = state.sessions.register();
    info!(session_id = %id, "dashboard client connected");

    if socket
        .send(text(&ServerMessage::connected(id)))
        .await
        .is_err()
    {
        state.sessions.unregister(&id);
        return;
    }

    let (entry_tx, entry_rx) = mpsc::channel(state.sessions.send_queue());
    let session =
        match StreamSession::open(id, &*state.engine, entry_tx, cancel).await {
            Ok(session) => session,
            Err(e) => {
                warn!(session_id = %id, error = %e, "could not open engine subscription");
                let message = ApiError::from(e).message;
                for frame in [text(&ServerMessage::Error { message }), Message::Close(None)] {
                    if let Err(e) = socket.send(frame).await {
                        debug!(session_id = %id, error = %e, "client gone before open failure was reported");
                        break;
                    }
                }
                state.sessions.unregister(&id);
                return;
            }
        };
    let relay = tokio::spawn(session.run());

    let (sink, stream) = socket.split();
    let (control_tx, control_rx) = mpsc::channel(CONTROL_QUEUE);

    let writer = write_loop(sink, entry_rx, control_rx, state.heartbeat);
    let reader = read_loop(id, stream, control_tx);
    tokio::select! {
        () = writer => debug!(session_id = %id, "writer finished"),
        () = reader => debug!(session_id = %id, "reader finished"),
    }

    // The entry receiver is gone; make sure the relay stops even if it is
    // parked on the engine.
    state.sessions.cancel(&id);
    match relay.await {
        Ok(SessionEnd::EngineFailed(reason)) => {
            debug!(session_id = %id, reason = %reason, "relay ended on engine failure");
        }
        Ok(end) => debug!(session_id = %id, end = ?end, "relay ended"),
        Err(e) => warn!(session_id = %id, error = %e, "relay task failed"),
    }
    state.sessions.unregister(&id);
}

async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut entries: mpsc::Receiver<LogEntry>,
    mut control: mpsc::Receiver<ServerMessage>,
    heartbeat: std::time::Duration,
) {
    let mut ping = tokio::time::interval(heartbeat);
    ping.tick().await;

    loop {
        tokio::select! {
            biased;
            Some(reply) = control.recv() => {
                if sink.send(text(&reply)).await.is_err() {
                    break;
                }
            }
            entry = entries.recv() => {
                let Some(payload) = entry else {
                    // Relay ended: engine closed the stream or shutdown.
                    if let Err(e) = sink.send(Message::Close(None)).await {
                        debug!(error = %e, "close frame not delivered to client");
                    }
                    break;
                };
                if sink.send(text(&ServerMessage::LogEntry { payload })).await.is_err() {
                    break;
                }
            }
            _ = ping.tick() => {
                if sink.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }
        }
    }
}

async fn read_loop(
    id: SessionId,
    mut stream: futures_util::stream::SplitStream<WebSocket>,
    control: mpsc::Sender<ServerMessage>,
) {
    while let Some(Ok(message)) = stream.next().await {
        let reply = match message {
            Message::Text(raw) => match serde_json::from_str::<ClientMessage>(raw.as_str()) {
                Ok(ClientMessage::Subscribe) => ServerMessage::Subscribed,
                Ok(ClientMessage::Ping) => ServerMessage::Pong,
                Err(e) => {
                    debug!(session_id = %id, error = %e, "ignoring client message");
                    continue;
                }
            },
            Message::Close(_) => break,
            // axum answers pings itself
            _ => continue,
        };
        if control.send(reply).await.is_err() {
            break;
        }
    }
}

fn text(message: &ServerMessage) -> Message {
    Message::Text(message.to_json().into())
}
