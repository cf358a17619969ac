// ── Traffic series domain types ──

use serde::{Deserialize, Serialize};

/// One display-ready time bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficPoint {
    /// Display label for the bucket start (UTC).
    pub time: String,
    /// Bucket start, epoch seconds. Clients sort on this.
    pub timestamp: i64,
    pub inbound: u64,
    pub outbound: u64,
    pub blocked: u64,
}

/// Reshaped traffic statistics for one requested range.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficSeries {
    pub time_period: String,
    pub total_inbound: u64,
    pub total_outbound: u64,
    pub total_blocked: u64,
    pub points: Vec<TrafficPoint>,
}
