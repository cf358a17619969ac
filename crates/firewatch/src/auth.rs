// ── Session gate ──
//
// Authentication itself belongs to an external collaborator. The gateway
// only checks a shared bearer token when one is configured; with no
// token every route is open.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::routes::error::ApiError;

/// Shared-token gate for REST routes and the WebSocket upgrade.
#[derive(Debug, Clone, Default)]
pub struct SessionGate {
    token: Option<SecretString>,
}

impl SessionGate {
    pub fn new(token: Option<SecretString>) -> Self {
        Self { token }
    }

    /// A gate that lets everything through.
    pub fn open() -> Self {
        Self::default()
    }

    pub fn is_enforced(&self) -> bool {
        self.token.is_some()
    }

    /// Check a request's credentials.
    ///
    /// Accepts `Authorization: Bearer <token>`, or `?token=<token>` for
    /// browsers that cannot set headers on a WebSocket upgrade.
    pub fn admits(&self, request: &Request) -> bool {
        let Some(expected) = self.token.as_ref() else {
            return true;
        };
        let expected = expected.expose_secret().as_bytes();

        let from_header = request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim);
        if from_header.is_some_and(|t| constant_time_eq(t.as_bytes(), expected)) {
            return true;
        }

        request.uri().query().is_some_and(|query| {
            url::form_urlencoded::parse(query.as_bytes())
                .any(|(k, v)| k == "token" && constant_time_eq(v.as_bytes(), expected))
        })
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Middleware rejecting requests the gate does not admit.
pub async fn require_token(
    State(gate): State<Arc<SessionGate>>,
    request: Request,
    next: Next,
) -> Response {
    if gate.admits(&request) {
        next.run(request).await
    } else {
        debug!(path = %request.uri().path(), "request rejected by session gate");
        ApiError::unauthorized().into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;

    use super::*;

    fn request(uri: &str, bearer: Option<&str>) -> Request {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = bearer {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn open_gate_admits_everything() {
        let gate = SessionGate::open();
        assert!(!gate.is_enforced());
        assert!(gate.admits(&request("/api/rules", None)));
    }

    #[test]
    fn bearer_header_and_query_token() {
        let gate = SessionGate::new(Some(SecretString::from("letmein")));
        assert!(gate.admits(&request("/api/rules", Some("letmein"))));
        assert!(gate.admits(&request("/ws?token=letmein", None)));
        assert!(!gate.admits(&request("/api/rules", Some("nope"))));
        assert!(!gate.admits(&request("/api/rules", None)));
        assert!(!gate.admits(&request("/ws?token=letmei", None)));
    }
}
