// ── Traffic stats reshaper ──
//
// Converts the engine's bucketed statistics into a display-ready series.
// Pure: no I/O, no clock. Labels are rendered in UTC so the same engine
// answer always produces the same series.

use std::fmt;

use chrono::{DateTime, Utc};
use firewatch_api::engine::models::{RawTrafficPoint, TrafficStatsResponse};
use serde_json::Value;

use crate::model::{TrafficPoint, TrafficSeries};

/// Epoch values above this are taken to be milliseconds.
const MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

// ── TimeRange ────────────────────────────────────────────────────────

/// Requested statistics window, in dashboard vocabulary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum TimeRange {
    FiveMinutes,
    Hour,
    #[default]
    Day,
    Week,
    Month,
    /// Anything else. Forwarded to the engine untouched.
    Other(String),
}

impl TimeRange {
    pub const DEFAULT: &'static str = "24h";

    /// Classify a range string. Accepts the engine spellings `1w` and
    /// `month` as aliases.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "5m" => Self::FiveMinutes,
            "1h" => Self::Hour,
            "24h" => Self::Day,
            "7d" | "1w" => Self::Week,
            "30d" | "month" => Self::Month,
            other => Self::Other(other.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::FiveMinutes => "5m",
            Self::Hour => "1h",
            Self::Day => "24h",
            Self::Week => "7d",
            Self::Month => "30d",
            Self::Other(raw) => raw,
        }
    }

    /// `strftime` pattern for bucket labels in this range.
    pub fn label_format(&self) -> &'static str {
        match self {
            Self::Week | Self::Month => "%d/%m",
            Self::FiveMinutes => "%H:%M:%S",
            _ => "%H:%M",
        }
    }

    /// Render a bucket start as a UTC label.
    pub fn label(&self, timestamp: i64) -> String {
        DateTime::<Utc>::from_timestamp(timestamp, 0)
            .unwrap_or(DateTime::UNIX_EPOCH)
            .format(self.label_format())
            .to_string()
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Reshaping ────────────────────────────────────────────────────────

/// Reshape an engine stats response for `range`.
///
/// Missing or unparseable numbers become 0. A missing series becomes an
/// empty one. `timePeriod` falls back to the requested range.
pub fn reshape(raw: TrafficStatsResponse, range: &TimeRange) -> TrafficSeries {
    let points = raw
        .data_points
        .unwrap_or_default()
        .iter()
        .map(|point| reshape_point(point, range))
        .collect();

    TrafficSeries {
        time_period: raw
            .time_period
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| range.as_str().to_owned()),
        total_inbound: coerce_count(&raw.total_inbound),
        total_outbound: coerce_count(&raw.total_outbound),
        total_blocked: coerce_count(&raw.total_blocked),
        points,
    }
}

fn reshape_point(point: &RawTrafficPoint, range: &TimeRange) -> TrafficPoint {
    let timestamp = coerce_epoch_secs(&point.timestamp);
    TrafficPoint {
        time: range.label(timestamp),
        timestamp,
        inbound: coerce_count(&point.inbound),
        outbound: coerce_count(&point.outbound),
        blocked: coerce_count(&point.blocked),
    }
}

/// Coerce a loosely typed engine counter into a native number.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn coerce_count(value: &Value) -> u64 {
    let from_float = |f: f64| {
        if f.is_finite() && f > 0.0 {
            f as u64
        } else {
            0
        }
    };
    match value {
        Value::Number(n) => n.as_u64().unwrap_or_else(|| n.as_f64().map_or(0, from_float)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u64>()
                .unwrap_or_else(|_| s.parse::<f64>().map_or(0, from_float))
        }
        _ => 0,
    }
}

/// Coerce a bucket start into epoch seconds.
///
/// Accepts seconds, milliseconds, numeric strings and RFC 3339 strings.
#[allow(clippy::cast_possible_truncation)]
fn coerce_epoch_secs(value: &Value) -> i64 {
    let raw = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                DateTime::parse_from_rfc3339(s)
                    .ok()
                    .map(|dt| dt.timestamp())
            })
        }
        _ => None,
    };
    match raw {
        Some(ts) if ts > MILLIS_THRESHOLD => ts / 1000,
        Some(ts) if ts > 0 => ts,
        _ => 0,
    }
}
