// Traffic statistics, reshaped for charts.

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use serde::Deserialize;

use firewatch_core::{TimeRange, TrafficSeries};

use super::error::ApiError;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct TrafficQuery {
    pub range: Option<String>,
}

pub async fn stats(
    State(state): State<AppState>,
    query: Result<Query<TrafficQuery>, QueryRejection>,
) -> Result<Json<TrafficSeries>, ApiError> {
    let Query(query) = query?;
    let range = query
        .range
        .as_deref()
        .filter(|r| !r.trim().is_empty())
        .map_or_else(TimeRange::default, TimeRange::parse);
    Ok(Json(state.engine.traffic_stats(&range).await?))
}
