use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::ApiEndpoint;
use crate::dates::today;
use crate::{error::AppResult, state::AppState};

#[derive(Debug, Deserialize)]
pub struct UsageQuery {
    pub endpoint: ApiEndpoint,
}

#[derive(Debug, Serialize)]
pub struct UsageResponse {
    pub endpoint: ApiEndpoint,
    pub count: i32,
    pub limit: i32,
    pub remaining: i32,
}

pub fn usage_routes() -> Router<AppState> {
    Router::new().route("/tools/usage", get(get_usage))
}

#[instrument(skip(state))]
pub async fn get_usage(
    State(state): State<AppState>,
    Query(q): Query<UsageQuery>,
) -> AppResult<Json<UsageResponse>> {
    let count = state.usage.count(q.endpoint, today()).await?;
    let limit = state.config.api_daily_limit;
    Ok(Json(UsageResponse {
        endpoint: q.endpoint,
        count,
        limit,
        remaining: (limit - count).max(0),
    }))
}
