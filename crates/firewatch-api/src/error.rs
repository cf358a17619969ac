use thiserror::Error;

/// Top-level error type for the `firewatch-api` crate.
///
/// Covers every failure mode of the engine interface: transport,
/// engine-side rejections, and the log stream. `firewatch-core` maps
/// these into the gateway's domain taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Engine responses ────────────────────────────────────────────
    /// The engine has no such resource (HTTP 404).
    #[error("Not found: {path}")]
    NotFound { path: String, message: String },

    /// The engine refused the request as invalid. The message is the
    /// engine's own text, untouched.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// Any other non-success answer from the engine.
    #[error("Engine error (HTTP {status}): {message}")]
    Engine {
        status: u16,
        message: String,
        code: Option<String>,
    },

    // ── Log stream ──────────────────────────────────────────────────
    /// Could not open the log stream.
    #[error("Log stream connection failed: {0}")]
    StreamConnect(String),

    /// Read failure on an open log stream.
    #[error("Log stream error: {0}")]
    Stream(String),

    /// The engine closed the log stream with a non-normal close code.
    #[error("Log stream closed (code {code}): {reason}")]
    StreamClosed { code: u16, reason: String },

    /// The log stream was cancelled by its owner.
    #[error("Log stream cancelled")]
    StreamCancelled,

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the engine could not be reached at all
    /// (connect failure, timeout, broken transport).
    pub fn is_unavailable(&self) -> bool {
        match self {
            Self::Transport(e) => e.status().is_none() && !e.is_decode(),
            Self::StreamConnect(_) => true,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            _ => false,
        }
    }

    /// Returns `true` if this error is the artifact of an owner-initiated
    /// cancellation rather than a fault.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::StreamCancelled)
    }

    /// Extract the engine error code, if available.
    pub fn engine_error_code(&self) -> Option<&str> {
        match self {
            Self::Engine { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn rejected_displays_engine_message_verbatim() {
        let err = Error::Rejected {
            status: 400,
            message: "rule name must not be empty".into(),
        };
        assert_eq!(err.to_string(), "rule name must not be empty");
    }

    #[test]
    fn classification_helpers() {
        assert!(Error::StreamCancelled.is_cancelled());
        assert!(!Error::Stream("boom".into()).is_cancelled());
        assert!(Error::StreamConnect("refused".into()).is_unavailable());
        assert!(
            Error::NotFound {
                path: "/v1/rules/9".into(),
                message: "no such rule".into(),
            }
            .is_not_found()
        );
        let engine = Error::Engine {
            status: 500,
            message: "internal".into(),
            code: Some("engine.internal".into()),
        };
        assert_eq!(engine.engine_error_code(), Some("engine.internal"));
        assert!(!engine.is_unavailable());
    }
}
