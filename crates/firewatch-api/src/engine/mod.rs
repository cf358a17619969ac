// Engine control API client modules
//
// Hand-written client for the firewall engine's JSON control endpoints
// (status, rules, traffic statistics) plus the log-stream subscription.

pub mod client;
pub mod logs;
pub mod models;
pub mod rules;
pub mod stats;
pub mod status;

pub use client::EngineClient;
pub use stats::engine_time_range;
