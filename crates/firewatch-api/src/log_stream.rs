//! Engine log stream subscription.
//!
//! Opens the engine's log WebSocket and forwards each text frame as a
//! [`LogRecord`] through a bounded channel. One background task owns the
//! socket; a [`CancellationToken`] ties its lifetime to the handle.
//!
//! Cancelling (explicitly, through a parent token, or by dropping the
//! [`LogStream`]) makes the task send a Close frame to the engine so the
//! engine stops producing for this consumer. There is no reconnect: a
//! stream that ends stays ended.
//!
//! # Example
//!
//! ```rust,ignore
//! use firewatch_api::EngineClient;
//! use tokio_util::sync::CancellationToken;
//!
//! let mut stream = client.subscribe_log_stream(CancellationToken::new()).await?;
//! while let Some(Ok(record)) = stream.recv().await {
//!     println!("[{}] {}", record.level, record.message);
//! }
//! stream.cancel();
//! ```

use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, client::IntoClientRequest, protocol::frame::coding::CloseCode};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

// ── Channel capacity ─────────────────────────────────────────────────

const RECORD_CHANNEL_CAPACITY: usize = 256;

type EngineSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ── LogRecord ────────────────────────────────────────────────────────

/// One raw entry from the engine log stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// The unstructured log line.
    pub message: String,

    /// Engine log level, e.g. `"INFO"`, `"WARN"`.
    #[serde(default = "default_level")]
    pub level: String,

    /// Engine-side timestamp, if the engine attached one.
    #[serde(default)]
    pub timestamp: Option<String>,
}

fn default_level() -> String {
    "INFO".into()
}

impl LogRecord {
    /// Build a record from a text frame.
    ///
    /// Frames are normally JSON records; a bare text frame is taken as the
    /// message itself at `INFO` level.
    pub fn from_frame(text: &str) -> Self {
        serde_json::from_str(text).unwrap_or_else(|_| Self {
            message: text.to_owned(),
            level: default_level(),
            timestamp: None,
        })
    }
}

// ── LogStream ────────────────────────────────────────────────────────

/// Handle to one engine log subscription.
///
/// Dropping the handle cancels the subscription.
#[derive(Debug)]
pub struct LogStream {
    records: mpsc::Receiver<Result<LogRecord, Error>>,
    cancel: CancellationToken,
    finished: bool,
}

impl LogStream {
    /// Connect to the engine log WebSocket and spawn the reader task.
    ///
    /// Returns once the handshake has completed. The handshake honours the
    /// transport's TLS mode, gives up after its timeout, and stops early
    /// with `StreamCancelled` if `cancel` fires first.
    pub async fn connect(
        url: &Url,
        transport: &TransportConfig,
        cancel: CancellationToken,
    ) -> Result<Self, Error> {
        info!(url = %url, "opening engine log stream");

        let request = url
            .as_str()
            .into_client_request()
            .map_err(|e| Error::StreamConnect(e.to_string()))?;
        let connector = transport.ws_connector()?;
        let handshake = tokio_tungstenite::connect_async_tls_with_config(
            request, None, false, connector,
        );

        let socket = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::StreamCancelled),
            result = tokio::time::timeout(transport.timeout, handshake) => match result {
                Ok(Ok((socket, _response))) => socket,
                Ok(Err(e)) => return Err(Error::StreamConnect(e.to_string())),
                Err(_) => {
                    return Err(Error::StreamConnect(format!(
                        "handshake timed out after {:?}",
                        transport.timeout
                    )));
                }
            },
        };

        debug!("engine log stream connected");

        let (tx, rx) = mpsc::channel(RECORD_CHANNEL_CAPACITY);
        tokio::spawn(pump(socket, tx, cancel.clone()));

        Ok(Self::from_receiver(rx, cancel))
    }

    /// Wrap an existing record channel.
    ///
    /// Used by non-WebSocket sources (in-memory engines, replays). The
    /// producer is expected to stop when `cancel` fires.
    pub fn from_receiver(
        records: mpsc::Receiver<Result<LogRecord, Error>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            records,
            cancel,
            finished: false,
        }
    }

    /// Receive the next record.
    ///
    /// After cancellation this yields `Err(Error::StreamCancelled)` once and
    /// then `None`. When the engine ends the stream it yields `None`.
    pub async fn recv(&mut self) -> Option<Result<LogRecord, Error>> {
        if self.finished {
            return None;
        }

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                self.finished = true;
                Some(Err(Error::StreamCancelled))
            }
            item = self.records.recv() => {
                if item.is_none() {
                    self.finished = true;
                }
                item
            }
        }
    }

    /// Cancel the subscription. Idempotent.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the subscription has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

}

impl Drop for LogStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Background reader ────────────────────────────────────────────────

/// Read frames until the engine ends the stream, the consumer goes away,
/// or the subscription is cancelled.
async fn pump(
    mut socket: EngineSocket,
    tx: mpsc::Sender<Result<LogRecord, Error>>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                close_engine_side(&mut socket).await;
                return;
            }
            () = tx.closed() => {
                close_engine_side(&mut socket).await;
                return;
            }
            frame = socket.next() => {
                match frame {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        let record = LogRecord::from_frame(text.as_str());
                        if tx.send(Ok(record)).await.is_err() {
                            close_engine_side(&mut socket).await;
                            return;
                        }
                    }
                    Some(Ok(tungstenite::Message::Close(frame))) => {
                        match frame {
                            Some(cf) if cf.code != CloseCode::Normal => {
                                warn!(code = %cf.code, reason = %cf.reason, "engine closed log stream");
                                let _ = tx
                                    .send(Err(Error::StreamClosed {
                                        code: cf.code.into(),
                                        reason: cf.reason.to_string(),
                                    }))
                                    .await;
                            }
                            _ => info!("engine ended log stream"),
                        }
                        return;
                    }
                    Some(Ok(tungstenite::Message::Ping(_))) => {
                        // tungstenite queues the pong automatically
                        trace!("engine log stream ping");
                    }
                    Some(Ok(_)) => {
                        // Binary, Pong, Frame -- ignore
                    }
                    Some(Err(e)) => {
                        let _ = tx.send(Err(Error::Stream(e.to_string()))).await;
                        return;
                    }
                    None => {
                        info!("engine log stream ended without close frame");
                        return;
                    }
                }
            }
        }
    }
}

/// Tell the engine this consumer is gone.
async fn close_engine_side(socket: &mut EngineSocket) {
    debug!("closing engine log stream");
    if let Err(e) = socket.close(None).await {
        trace!(error = %e, "close frame not delivered");
    }
}

// ── Tests ────────────────────────────────────────────────────────────
