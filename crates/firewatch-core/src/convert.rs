// ── Engine-to-domain type conversions ──
//
// Bridges the engine's snake_case wire types and the dashboard's
// camelCase vocabulary. Rules carry the same fields on both sides; only
// names and the action spelling differ.

use firewatch_api::engine::models::{
    EngineRule, EngineStatus, RuleAction as WireAction, RulePatch, RuleSpec,
};

use crate::model::{EngineHealth, Rule, RuleAction, RuleDraft, RuleUpdate};

// ── Rule action ────────────────────────────────────────────────────

impl From<WireAction> for RuleAction {
    fn from(action: WireAction) -> Self {
        match action {
            WireAction::Allow => Self::Allow,
            WireAction::Deny => Self::Deny,
        }
    }
}

impl From<RuleAction> for WireAction {
    fn from(action: RuleAction) -> Self {
        match action {
            RuleAction::Allow => Self::Allow,
            RuleAction::Deny => Self::Deny,
        }
    }
}

// ── Rules ──────────────────────────────────────────────────────────

impl From<EngineRule> for Rule {
    fn from(r: EngineRule) -> Self {
        Self {
            id: r.id,
            name: r.name,
            source_ip: r.source_ip,
            dest_ip: r.destination_ip,
            source_port: r.source_port,
            dest_port: r.destination_port,
            protocol: r.protocol,
            action: r.action.into(),
        }
    }
}

impl From<RuleDraft> for RuleSpec {
    fn from(d: RuleDraft) -> Self {
        Self {
            name: d.name,
            source_ip: d.source_ip,
            destination_ip: d.dest_ip,
            source_port: d.source_port,
            destination_port: d.dest_port,
            protocol: d.protocol,
            action: d.action.into(),
        }
    }
}

impl From<RuleUpdate> for RulePatch {
    fn from(u: RuleUpdate) -> Self {
        Self {
            name: u.name,
            source_ip: u.source_ip,
            destination_ip: u.dest_ip,
            source_port: u.source_port,
            destination_port: u.dest_port,
            protocol: u.protocol,
            action: u.action.map(Into::into),
        }
    }
}

// ── Status ─────────────────────────────────────────────────────────

impl From<EngineStatus> for EngineHealth {
    fn from(s: EngineStatus) -> Self {
        Self {
            status: s.status,
            version: s.version,
            uptime_seconds: s.uptime_seconds,
            active_rules: s.active_rules,
            extra: s.extra,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn engine_rule_renames_fields() {
        let rule: Rule = EngineRule {
            id: 5,
            name: "Block telnet".into(),
            source_ip: "0.0.0.0/0".into(),
            destination_ip: "10.0.0.9".into(),
            source_port: 0,
            destination_port: 23,
            protocol: "TCP".into(),
            action: WireAction::Deny,
        }
        .into();

        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["destIp"], "10.0.0.9");
        assert_eq!(json["destPort"], 23);
        assert_eq!(json["action"], "Deny");
    }

    #[test]
    fn update_maps_to_sparse_patch() {
        let patch: RulePatch = RuleUpdate {
            dest_port: Some(8443),
            action: Some(RuleAction::Allow),
            ..RuleUpdate::default()
        }
        .into();
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            serde_json::json!({ "destination_port": 8443, "action": "ALLOW" })
        );
    }
}
