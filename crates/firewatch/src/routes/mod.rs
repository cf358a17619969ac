// ── REST surface ──

pub mod error;
pub mod rules;
pub mod status;
pub mod traffic;

use axum::Router;
use axum::routing::{get, put};

use crate::server::AppState;

/// Routes mounted under the API prefix. The session gate is applied by
/// the caller.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/rules", get(rules::list).post(rules::create))
        .route("/rules/{id}", put(rules::update).delete(rules::delete))
        .route("/traffic", get(traffic::stats))
        .route("/status", get(status::engine_status))
}
