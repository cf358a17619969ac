// ── Dashboard push-channel messages ──
//
// Everything on the WebSocket is a JSON object tagged by `type`.

use serde::{Deserialize, Serialize};

use firewatch_core::{LogEntry, SessionId};

/// Server → client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// First message on every connection.
    Connection {
        status: ConnectionStatus,
        #[serde(rename = "sessionId")]
        session_id: SessionId,
    },
    /// One parsed traffic event.
    LogEntry { payload: LogEntry },
    /// Reply to `subscribe`. Streaming starts regardless.
    Subscribed,
    Pong,
    Error { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connected,
}

impl ServerMessage {
    pub fn connected(session_id: SessionId) -> Self {
        Self::Connection {
            status: ConnectionStatus::Connected,
            session_id,
        }
    }

    pub fn to_json(&self) -> String {
        // Every variant is plain data; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Client → server. Unknown types fail to parse and are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Subscribe,
    Ping,
}
