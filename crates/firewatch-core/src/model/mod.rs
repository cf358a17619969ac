// ── Domain model ──
//
// Client-facing shapes. Everything here serializes in the dashboard's
// camelCase vocabulary; the engine's snake_case wire types stay in
// `firewatch_api::engine::models` and are bridged by `crate::convert`.

pub mod event;
pub mod rule;
pub mod status;
pub mod traffic;

// ── Re-exports ──────────────────────────────────────────────────────

pub use event::{LogEntry, TrafficAction, TrafficEvent};
pub use rule::{Rule, RuleAction, RuleDraft, RuleUpdate};
pub use status::EngineHealth;
pub use traffic::{TrafficPoint, TrafficSeries};
