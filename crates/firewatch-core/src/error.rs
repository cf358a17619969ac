// ── Core error types ──
//
// Domain errors for the gateway. Consumers never see reqwest errors or
// raw HTTP statuses from the engine: the `From<firewatch_api::Error>`
// impl folds transport-layer failures into this taxonomy.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Engine reachability ──────────────────────────────────────────
    /// The engine could not be reached (connect failure, timeout, TLS).
    #[error("Firewall engine unavailable: {reason}")]
    EngineUnavailable { reason: String },

    // ── Request errors ───────────────────────────────────────────────
    /// The request was refused as invalid. `message` is shown to the
    /// client as-is, so engine rejections keep the engine's wording.
    #[error("{message}")]
    Validation { message: String },

    #[error("{entity} not found: {identifier}")]
    NotFound { entity: String, identifier: String },

    // ── Stream lifecycle ─────────────────────────────────────────────
    /// The log subscription was cancelled by its owner. Not a fault.
    #[error("Log stream cancelled")]
    StreamCancelled,

    // ── Engine failures ──────────────────────────────────────────────
    #[error("Engine error (HTTP {status}): {message}")]
    Engine { status: u16, message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for a missing firewall rule.
    pub fn rule_not_found(id: u64) -> Self {
        Self::NotFound {
            entity: "rule".into(),
            identifier: id.to_string(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<firewatch_api::Error> for CoreError {
    fn from(err: firewatch_api::Error) -> Self {
        use firewatch_api::Error as Api;

        if err.is_unavailable() {
            return CoreError::EngineUnavailable {
                reason: err.to_string(),
            };
        }

        match err {
            Api::Transport(e) => match e.status() {
                Some(status) => CoreError::Engine {
                    status: status.as_u16(),
                    message: e.to_string(),
                },
                None => CoreError::Internal(format!("engine response unreadable: {e}")),
            },
            Api::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid engine URL: {e}"),
            },
            Api::Tls(msg) => CoreError::EngineUnavailable {
                reason: format!("TLS error: {msg}"),
            },
            Api::NotFound { path, message } => CoreError::NotFound {
                entity: "resource".into(),
                identifier: if message.is_empty() { path } else { message },
            },
            Api::Rejected { message, .. } => CoreError::Validation { message },
            Api::Engine {
                status, message, ..
            } => CoreError::Engine { status, message },
            Api::StreamConnect(reason) => CoreError::EngineUnavailable { reason },
            Api::Stream(reason) => CoreError::Engine {
                status: 0,
                message: format!("log stream failed: {reason}"),
            },
            Api::StreamClosed { code, reason } => CoreError::Engine {
                status: 0,
                message: format!("log stream closed by engine (code {code}): {reason}"),
            },
            Api::StreamCancelled => CoreError::StreamCancelled,
            Api::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn rejection_keeps_engine_wording() {
        let err: CoreError = firewatch_api::Error::Rejected {
            status: 400,
            message: "rule name must not be empty".into(),
        }
        .into();
        assert!(matches!(err, CoreError::Validation { .. }));
        assert_eq!(err.to_string(), "rule name must not be empty");
    }

    #[test]
    fn stream_errors_map_by_kind() {
        assert!(matches!(
            CoreError::from(firewatch_api::Error::StreamCancelled),
            CoreError::StreamCancelled
        ));
        assert!(matches!(
            CoreError::from(firewatch_api::Error::StreamConnect("refused".into())),
            CoreError::EngineUnavailable { .. }
        ));
        assert!(matches!(
            CoreError::from(firewatch_api::Error::StreamClosed {
                code: 1011,
                reason: "overflow".into()
            }),
            CoreError::Engine { .. }
        ));
    }

    #[test]
    fn engine_not_found_and_failure() {
        let err = CoreError::from(firewatch_api::Error::NotFound {
            path: "/v1/rules/9".into(),
            message: String::new(),
        });
        assert_eq!(err.to_string(), "resource not found: /v1/rules/9");

        let err = CoreError::from(firewatch_api::Error::Engine {
            status: 500,
            message: "rule table locked".into(),
            code: None,
        });
        assert!(matches!(err, CoreError::Engine { status: 500, .. }));
    }

    #[test]
    fn rule_not_found_names_the_id() {
        assert_eq!(CoreError::rule_not_found(7).to_string(), "rule not found: 7");
    }
}
