use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::instrument;

use super::{repo, Ingredient};
use crate::{auth::AuthUser, error::AppResult, state::AppState};

#[derive(Debug, Deserialize)]
pub struct IngredientQuery {
    pub q: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
}
fn default_limit() -> i64 { 50 }

pub fn ingredient_routes() -> Router<AppState> {
    Router::new().route("/ingredients", get(list_ingredients))
}

#[instrument(skip(state))]
pub async fn list_ingredients(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Query(q): Query<IngredientQuery>,
) -> AppResult<Json<Vec<Ingredient>>> {
    let rows = repo::search(&state.db, q.q.as_deref(), q.limit.clamp(1, 200)).await?;
    Ok(Json(rows))
}
