// Engine wire types
//
// Request/response bodies exactly as the engine speaks them. Field names
// are the engine's snake_case vocabulary; `firewatch-core` reshapes them
// for dashboard clients. Fields use `#[serde(default)]` where the engine
// is known to omit them.

use serde::{Deserialize, Serialize};

// ── Rules ────────────────────────────────────────────────────────────

/// Verdict a rule applies to matching traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuleAction {
    Allow,
    Deny,
}

/// A rule as stored by the engine. `id` is engine-assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineRule {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub source_ip: String,
    #[serde(default)]
    pub destination_ip: String,
    #[serde(default)]
    pub source_port: u16,
    #[serde(default)]
    pub destination_port: u16,
    #[serde(default)]
    pub protocol: String,
    pub action: RuleAction,
}

/// Rule fields sent on create. Carries no `id`: the engine assigns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub name: String,
    pub source_ip: String,
    pub destination_ip: String,
    pub source_port: u16,
    pub destination_port: u16,
    pub protocol: String,
    pub action: RuleAction,
}

/// Partial rule update. Absent fields are left untouched by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<RuleAction>,
}

/// `{ "rule": ... }` wrapper used by create/update requests and replies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleEnvelope<T> {
    pub rule: T,
}

/// `GET /v1/rules` reply.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuleList {
    #[serde(default)]
    pub rules: Vec<EngineRule>,
}

/// `DELETE /v1/rules/{id}` reply.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DeleteAck {
    #[serde(default)]
    pub success: bool,
}

// ── Status ───────────────────────────────────────────────────────────

/// Engine health snapshot from `GET /v1/status`.
///
/// The commonly used fields are modelled; everything else the engine
/// reports lands in `extra` so nothing is silently dropped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub uptime_seconds: Option<u64>,
    #[serde(default)]
    pub active_rules: Option<u64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

// ── Traffic statistics ───────────────────────────────────────────────

/// Bucketed traffic statistics from `GET /v1/traffic`.
///
/// Numeric fields are loosely typed: the engine is allowed to emit numbers
/// as JSON strings. Coercion happens in the reshaper, not here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrafficStatsResponse {
    #[serde(default)]
    pub time_period: Option<String>,
    #[serde(default)]
    pub total_inbound: serde_json::Value,
    #[serde(default)]
    pub total_outbound: serde_json::Value,
    #[serde(default)]
    pub total_blocked: serde_json::Value,
    #[serde(default)]
    pub data_points: Option<Vec<RawTrafficPoint>>,
}

/// One engine time bucket. `timestamp` is the bucket start.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTrafficPoint {
    #[serde(default)]
    pub timestamp: serde_json::Value,
    #[serde(default)]
    pub inbound: serde_json::Value,
    #[serde(default)]
    pub outbound: serde_json::Value,
    #[serde(default)]
    pub blocked: serde_json::Value,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn status_keeps_unknown_fields() {
        let status: EngineStatus = serde_json::from_value(serde_json::json!({
            "status": "running",
            "version": "2.4.1",
            "uptime_seconds": 3600,
            "packets_processed": 123_456
        }))
        .unwrap();
        assert_eq!(status.status, "running");
        assert_eq!(status.uptime_seconds, Some(3600));
        assert_eq!(status.active_rules, None);
        assert_eq!(status.extra["packets_processed"], 123_456);
    }

    #[test]
    fn patch_omits_absent_fields() {
        let patch = RulePatch {
            name: Some("renamed".into()),
            action: Some(RuleAction::Deny),
            ..RulePatch::default()
        };
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            serde_json::json!({ "name": "renamed", "action": "DENY" })
        );
    }

    #[test]
    fn traffic_response_tolerates_missing_series() {
        let raw: TrafficStatsResponse =
            serde_json::from_str(r#"{"time_period":"Last 24 hours","total_inbound":"42"}"#)
                .unwrap();
        assert!(raw.data_points.is_none());
        assert_eq!(raw.total_inbound, serde_json::json!("42"));
        assert!(raw.total_blocked.is_null());
    }
}
