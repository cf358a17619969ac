// firewatch-api: Async client for the firewall engine (control calls + log stream)

pub mod engine;
pub mod error;
pub mod log_stream;
pub mod transport;

pub use engine::EngineClient;
pub use error::Error;
pub use log_stream::{LogRecord, LogStream};
