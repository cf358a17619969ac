// Rule CRUD. The engine owns every rule; these handlers only relay.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Serialize;

use firewatch_core::{CoreError, Rule, RuleDraft, RuleUpdate};

use super::error::ApiError;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Rule>>, ApiError> {
    Ok(Json(state.engine.list_rules().await?))
}

pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<RuleDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<Rule>), ApiError> {
    let Json(draft) = body?;
    let rule = state.engine.create_rule(draft).await?;
    Ok((StatusCode::CREATED, Json(rule)))
}

pub async fn update(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
    body: Result<Json<RuleUpdate>, JsonRejection>,
) -> Result<Json<Rule>, ApiError> {
    let id = rule_id(id?)?;
    let Json(update) = body?;
    Ok(Json(state.engine.update_rule(id, update).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let id = rule_id(id?)?;
    state.engine.delete_rule(id).await?;
    Ok(Json(DeleteResponse { success: true }))
}

/// Rule ids are engine-assigned integers; anything else names no rule.
fn rule_id(Path(raw): Path<String>) -> Result<u64, ApiError> {
    raw.parse().map_err(|_| {
        ApiError::from(CoreError::NotFound {
            entity: "rule".into(),
            identifier: raw,
        })
    })
}
