//! Command-line errors with miette diagnostics.

use std::net::SocketAddr;

use miette::Diagnostic;
use thiserror::Error;

use firewatch_config::ConfigError;
use firewatch_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const CONFIG: i32 = 2;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum GatewayError {
    // ── Configuration ────────────────────────────────────────────────
    #[error("Invalid configuration")]
    #[diagnostic(
        code(firewatch::config),
        help(
            "Inspect the effective settings with: firewatch config show\n\
             Environment overrides use FIREWATCH_<SECTION>__<KEY>."
        )
    )]
    Config {
        #[from]
        source: ConfigError,
    },

    // ── Engine ───────────────────────────────────────────────────────
    #[error("Firewall engine at {url} is unavailable: {reason}")]
    #[diagnostic(
        code(firewatch::engine_unavailable),
        help(
            "Check that the engine is running and reachable.\n\
             Override the address with: firewatch serve --engine-url <URL>"
        )
    )]
    EngineUnavailable { url: String, reason: String },

    #[error(transparent)]
    #[diagnostic(code(firewatch::engine))]
    Core(CoreError),

    // ── Server ───────────────────────────────────────────────────────
    #[error("Could not listen on {addr}")]
    #[diagnostic(
        code(firewatch::bind),
        help("Is another process using the port? Set server.listen or pass --listen.")
    )]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    #[diagnostic(code(firewatch::io))]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    /// Attach the engine address to a core error.
    pub fn from_engine(url: &url::Url, err: CoreError) -> Self {
        match err {
            CoreError::EngineUnavailable { reason } => Self::EngineUnavailable {
                url: url.to_string(),
                reason,
            },
            CoreError::Config { message } => Self::Config {
                source: ConfigError::Validation {
                    field: "engine".into(),
                    reason: message,
                },
            },
            other => Self::Core(other),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => exit_code::CONFIG,
            Self::EngineUnavailable { .. } => exit_code::CONNECTION,
            Self::Core(_) | Self::Bind { .. } | Self::Io(_) => exit_code::GENERAL,
        }
    }
}
