// ── Firewall rule domain types ──
//
// The engine owns rules; the gateway only relays them. These are the
// dashboard-facing shapes.

use serde::{Deserialize, Serialize};
use strum::Display;

/// Verdict a rule applies. Also accepts the engine's uppercase spelling
/// and the dashboard's legacy `Block` on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
pub enum RuleAction {
    #[serde(alias = "ALLOW", alias = "allow")]
    Allow,
    #[default]
    #[serde(alias = "DENY", alias = "deny", alias = "Block", alias = "BLOCK")]
    Deny,
}

/// A firewall rule in client vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: u64,
    pub name: String,
    pub source_ip: String,
    pub dest_ip: String,
    pub source_port: u16,
    pub dest_port: u16,
    pub protocol: String,
    pub action: RuleAction,
}

/// Body of a create request.
///
/// `name` is required. There is no `id` field: a client-supplied id is
/// dropped during deserialization and the engine assigns one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDraft {
    pub name: String,
    #[serde(default)]
    pub source_ip: String,
    #[serde(default)]
    pub dest_ip: String,
    #[serde(default)]
    pub source_port: u16,
    #[serde(default)]
    pub dest_port: u16,
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub action: RuleAction,
}

/// Body of an update request. Absent fields stay as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<RuleAction>,
}

impl RuleUpdate {
    /// Apply this update to an existing rule in place.
    pub fn apply_to(&self, rule: &mut Rule) {
        if let Some(ref name) = self.name {
            rule.name.clone_from(name);
        }
        if let Some(ref ip) = self.source_ip {
            rule.source_ip.clone_from(ip);
        }
        if let Some(ref ip) = self.dest_ip {
            rule.dest_ip.clone_from(ip);
        }
        if let Some(port) = self.source_port {
            rule.source_port = port;
        }
        if let Some(port) = self.dest_port {
            rule.dest_port = port;
        }
        if let Some(ref proto) = self.protocol {
            rule.protocol.clone_from(proto);
        }
        if let Some(action) = self.action {
            rule.action = action;
        }
    }
}
