// ── Traffic event domain types ──

use std::net::IpAddr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

/// Verdict the engine applied to a packet flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum TrafficAction {
    Allowed,
    Blocked,
}

/// A structured traffic event recovered from one engine log line.
///
/// Only the parser builds these; they are never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficEvent {
    pub action: TrafficAction,
    /// Normalised protocol name (`TCP`, `UDP`, `ICMP`, `PROTO-<n>`, or the
    /// engine's own token).
    pub protocol: String,
    pub source_ip: IpAddr,
    pub source_port: u16,
    pub dest_ip: IpAddr,
    pub dest_port: u16,
    pub observed_at: DateTime<Utc>,
}

/// The `log_entry` payload pushed to dashboard clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub message: String,
    pub level: String,
    /// `observedAt`, RFC 3339.
    pub timestamp: String,
    pub action: TrafficAction,
    pub protocol: String,
    pub source_ip: IpAddr,
    pub source_port: u16,
    pub dest_ip: IpAddr,
    pub dest_port: u16,
}

impl LogEntry {
    /// Pair a parsed event with the raw line and level it came from.
    pub fn new(event: TrafficEvent, message: impl Into<String>, level: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: level.into(),
            timestamp: event
                .observed_at
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            action: event.action,
            protocol: event.protocol,
            source_ip: event.source_ip,
            source_port: event.source_port,
            dest_ip: event.dest_ip,
            dest_port: event.dest_port,
        }
    }
}
