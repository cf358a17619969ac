//! Engine log line parser.
//!
//! Turns one unstructured engine log line into a [`TrafficEvent`], or
//! `None` when the line does not describe a traffic decision. The parser
//! is pure and total: it never panics and never builds a half-filled
//! event. Any field that fails to parse discards the whole line.
//!
//! Recognised shape (whitespace-tolerant, anywhere in the line):
//!
//! ```text
//! TRAFFIC ALLOW | Proto: 6 | 10.0.0.1:1234 -> 10.0.0.2:80
//! ```
//!
//! An engine-native timestamp (`tv_sec`, `ts` or `timestamp`, followed by
//! `:` or `=`) anywhere in the line overrides the caller's fallback time,
//! provided it is a positive whole number of epoch seconds. Dates,
//! fractions and millisecond counts keep the fallback; a numeric token
//! too large for `i64` is malformed and discards the line.

use std::net::IpAddr;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::model::{TrafficAction, TrafficEvent};

static TRAFFIC_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"TRAFFIC\s+(?P<verdict>ALLOW|DENY)\s*\|\s*Proto:\s*(?P<proto>[^\s|]+)\s*\|\s*(?P<src>\S+)\s*->\s*(?P<dst>[^\s|,;]+)",
    )
    .expect("valid regex")
});

// `tail` catches dates and fractions (`2026-10-16T...`, `1700000000.5`),
// which are not epoch seconds.
static ENGINE_TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\b(?:tv_sec|ts|timestamp)"?\s*[:=]\s*"?(?P<value>[+-]?\d+)(?P<tail>[-:.T])?"#)
        .expect("valid regex")
});

/// Upper bound for epoch seconds. Anything larger is milliseconds or noise.
const MAX_EPOCH_SECS: i64 = 1_000_000_000_000;

/// Parse one engine log line.
///
/// `fallback` is used as the observation time unless the line carries a
/// plausible engine timestamp in epoch seconds.
pub fn parse(raw: &str, fallback: DateTime<Utc>) -> Option<TrafficEvent> {
    let caps = TRAFFIC_LINE.captures(raw)?;

    let action = match &caps["verdict"] {
        "ALLOW" => TrafficAction::Allowed,
        _ => TrafficAction::Blocked,
    };
    let protocol = normalize_protocol(&caps["proto"]);
    let (source_ip, source_port) = split_endpoint(&caps["src"])?;
    let (dest_ip, dest_port) = split_endpoint(&caps["dst"])?;
    let observed_at = observed_at(raw, fallback)?;

    Some(TrafficEvent {
        action,
        protocol,
        source_ip,
        source_port,
        dest_ip,
        dest_port,
        observed_at,
    })
}

/// Map IANA protocol numbers to names; textual tokens pass through.
pub fn normalize_protocol(token: &str) -> String {
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return token.to_owned();
    }
    match token.parse::<u64>() {
        Ok(6) => "TCP".into(),
        Ok(17) => "UDP".into(),
        Ok(1) => "ICMP".into(),
        Ok(n) => format!("PROTO-{n}"),
        Err(_) => format!("PROTO-{token}"),
    }
}

/// Split `ip:port`, `[v6]:port` or bare `v6:port` into typed parts.
fn split_endpoint(endpoint: &str) -> Option<(IpAddr, u16)> {
    let (host, port) = endpoint.rsplit_once(':')?;
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    let ip = host.parse::<IpAddr>().ok()?;
    let port = port.parse::<u16>().ok()?;
    Some((ip, port))
}

/// Observation time for the line: the embedded engine timestamp when it is
/// a plausible count of epoch seconds, else `fallback`. `None` means the
/// token is malformed.
fn observed_at(raw: &str, fallback: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let Some(caps) = ENGINE_TIMESTAMP.captures(raw) else {
        return Some(fallback);
    };
    if caps.name("tail").is_some() {
        return Some(fallback);
    }
    let secs = caps["value"].parse::<i64>().ok()?;
    if secs <= 0 || secs > MAX_EPOCH_SECS {
        return Some(fallback);
    }
    DateTime::from_timestamp(secs, 0)
}
