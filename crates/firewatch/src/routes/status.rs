// Engine status snapshot and gateway health.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use firewatch_core::EngineHealth;

use super::error::ApiError;
use crate::server::AppState;

pub async fn engine_status(State(state): State<AppState>) -> Result<Json<EngineHealth>, ApiError> {
    Ok(Json(state.engine.status().await?))
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub sessions: usize,
}

/// Liveness of the gateway itself. Never touches the engine.
pub async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        sessions: state.sessions.count(),
    })
}
