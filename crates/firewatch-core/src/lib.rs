// firewatch-core: Domain layer between firewatch-api and the gateway binary.

pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod model;
pub mod parser;
pub mod session;
pub mod traffic;

#[cfg(any(test, feature = "test-util"))]
pub mod memory;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{EngineConfig, TlsVerification};
pub use engine::{Engine, EngineApi, LogSource, RemoteEngine, TrafficStatsSource};
pub use error::CoreError;
pub use session::{SessionEnd, SessionId, StreamSession};
pub use traffic::TimeRange;

// Re-export model types at the crate root for ergonomics.
pub use model::{
    EngineHealth, LogEntry, Rule, RuleAction, RuleDraft, RuleUpdate, TrafficAction, TrafficEvent,
    TrafficPoint, TrafficSeries,
};

// The log stream handle is shared with the api crate unchanged.
pub use firewatch_api::{LogRecord, LogStream};
