//! Per-client stream session.
//!
//! A [`StreamSession`] bridges one dashboard client to one engine log
//! subscription. Every record from the engine runs through the
//! [parser](crate::parser); traffic events are pushed to the client as
//! [`LogEntry`] values and everything else is dropped quietly.
//!
//! The session ends when the client goes away, when the engine ends or
//! breaks the stream, or when its cancellation token fires. In every case
//! the engine subscription is cancelled and the client channel is closed
//! (the sender is dropped with the session).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use firewatch_api::{LogRecord, LogStream};

use crate::engine::LogSource;
use crate::error::CoreError;
use crate::model::LogEntry;
use crate::parser;

// ── SessionId ────────────────────────────────────────────────────────

/// Identifier of one client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ── SessionEnd ───────────────────────────────────────────────────────

/// Why a session stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The client channel closed.
    ClientDisconnected,
    /// The engine ended the log stream.
    EngineEnded,
    /// The log stream failed.
    EngineFailed(String),
    /// The session (or a parent token) was cancelled.
    Cancelled,
}

// ── StreamSession ────────────────────────────────────────────────────

/// One client's live log relay.
#[derive(Debug)]
pub struct StreamSession {
    id: SessionId,
    subscription: LogStream,
    client: mpsc::Sender<LogEntry>,
    cancel: CancellationToken,
}

impl StreamSession {
    /// Open the engine subscription for a newly connected client.
    ///
    /// `cancel` governs the subscription; pass a child of the server's
    /// shutdown token so shutdown reaches every session.
    pub async fn open<S>(
        id: SessionId,
        source: &S,
        client: mpsc::Sender<LogEntry>,
        cancel: CancellationToken,
    ) -> Result<Self, CoreError>
    where
        S: LogSource + ?Sized,
    {
        let subscription = source.subscribe(cancel.clone()).await?;
        debug!(session_id = %id, "engine subscription opened");
        Ok(Self {
            id,
            subscription,
            client,
            cancel,
        })
    }

    /// Cancel the engine subscription. Idempotent.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Relay records until the session ends.
    ///
    /// A full client channel is waited on, so one client sees events in
    /// the order its subscription produced them.
    pub async fn run(mut self) -> SessionEnd {
        let end = loop {
            tokio::select! {
                biased;
                () = self.client.closed() => break SessionEnd::ClientDisconnected,
                item = self.subscription.recv() => match item {
                    Some(Ok(record)) => {
                        let Some(entry) = to_entry(record) else {
                            continue;
                        };
                        tokio::select! {
                            biased;
                            () = self.cancel.cancelled() => break SessionEnd::Cancelled,
                            sent = self.client.send(entry) => {
                                if sent.is_err() {
                                    break SessionEnd::ClientDisconnected;
                                }
                            }
                        }
                    }
                    Some(Err(e)) if e.is_cancelled() => break SessionEnd::Cancelled,
                    Some(Err(e)) => break SessionEnd::EngineFailed(e.to_string()),
                    None => break SessionEnd::EngineEnded,
                },
            }
        };

        self.cancel();
        match &end {
            SessionEnd::ClientDisconnected => {
                info!(session_id = %self.id, "client disconnected, engine subscription cancelled");
            }
            SessionEnd::EngineEnded => info!(session_id = %self.id, "engine ended log stream"),
            SessionEnd::EngineFailed(error) => {
                warn!(session_id = %self.id, error = %error, "engine log stream failed");
            }
            SessionEnd::Cancelled => debug!(session_id = %self.id, "stream session cancelled"),
        }
        end
    }
}

/// Parse a record into a client entry. Non-traffic lines yield `None`.
fn to_entry(record: LogRecord) -> Option<LogEntry> {
    let fallback = record
        .timestamp
        .as_deref()
        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
        .map_or_else(Utc::now, |dt| dt.with_timezone(&Utc));

    let Some(event) = parser::parse(&record.message, fallback) else {
        trace!(line = %record.message, "log line skipped");
        return None;
    };
    Some(LogEntry::new(event, record.message, record.level))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::memory::MemoryEngine;
    use crate::model::TrafficAction;

    const ALLOW_LINE: &str = "TRAFFIC ALLOW | Proto: 6 | 10.0.0.1:1234 -> 10.0.0.2:80";

    async fn open_session(
        engine: &MemoryEngine,
        cancel: CancellationToken,
    ) -> (StreamSession, mpsc::Receiver<LogEntry>) {
        let (tx, rx) = mpsc::channel(8);
        let session = StreamSession::open(SessionId::new(), engine, tx, cancel)
            .await
            .unwrap();
        (session, rx)
    }

    #[test]
    fn record_timestamp_is_the_fallback() {
        let entry = to_entry(LogRecord {
            message: ALLOW_LINE.into(),
            level: "INFO".into(),
            timestamp: Some("2026-10-16T09:00:00Z".into()),
        })
        .unwrap();
        assert_eq!(entry.timestamp, "2026-10-16T09:00:00.000Z");
        assert_eq!(entry.action, TrafficAction::Allowed);
    }

    #[tokio::test]
    async fn traffic_lines_are_pushed_and_others_dropped() {
        let engine = MemoryEngine::new();
        let (session, mut rx) = open_session(&engine, CancellationToken::new()).await;
        let feed = engine.feeds().await.remove(0);
        let task = tokio::spawn(session.run());

        assert!(feed.send_line("engine heartbeat").await);
        assert!(feed.send_line(ALLOW_LINE).await);
        assert!(feed.send_line("TRAFFIC DENY | Proto: 17 | 1.1.1.1:53 -> 2.2.2.2:53").await);

        let first = rx.recv().await.unwrap();
        assert_eq!(first.message, ALLOW_LINE);
        assert_eq!(first.protocol, "TCP");
        let second = rx.recv().await.unwrap();
        assert_eq!(second.action, TrafficAction::Blocked);
        assert_eq!(second.protocol, "UDP");

        drop(rx);
        assert_eq!(task.await.unwrap(), SessionEnd::ClientDisconnected);
        assert!(feed.is_cancelled());
    }

    #[tokio::test]
    async fn cancelling_twice_is_harmless() {
        let engine = MemoryEngine::new();
        let (session, mut rx) = open_session(&engine, CancellationToken::new()).await;
        let feed = engine.feeds().await.remove(0);

        session.cancel();
        session.cancel();
        assert!(feed.is_cancelled());

        assert_eq!(session.run().await, SessionEnd::Cancelled);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn engine_end_closes_client_channel() {
        let engine = MemoryEngine::new();
        let (session, mut rx) = open_session(&engine, CancellationToken::new()).await;
        // Dropping every feed clone ends the record channel.
        let token = engine.feeds().await.remove(0).cancel_token();
        drop(engine);

        assert_eq!(session.run().await, SessionEnd::EngineEnded);
        assert!(rx.recv().await.is_none());
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn engine_failure_tears_session_down() {
        let engine = MemoryEngine::new();
        let (session, mut rx) = open_session(&engine, CancellationToken::new()).await;
        let feed = engine.feeds().await.remove(0);
        feed.fail("connection reset").await;

        match session.run().await {
            SessionEnd::EngineFailed(reason) => assert!(reason.contains("connection reset")),
            other => panic!("expected EngineFailed, got {other:?}"),
        }
        assert!(feed.is_cancelled());
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn parent_cancel_reaches_session() {
        let engine = MemoryEngine::new();
        let root = CancellationToken::new();
        let (session, _rx) = open_session(&engine, root.child_token()).await;
        let feed = engine.feeds().await.remove(0);
        let task = tokio::spawn(session.run());

        root.cancel();
        let end = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(end, SessionEnd::Cancelled);
        assert!(feed.is_cancelled());
    }
}
