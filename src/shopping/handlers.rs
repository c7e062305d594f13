use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::aggregate::ShoppingItem;
use super::dto::{CreateItemRequest, IngredientRef, ShoppingListItem, UpdateItemRequest};
use super::{repo, services};
use crate::{
    auth::AuthUser,
    dates::RangeQuery,
    error::{AppError, AppResult},
    ingredients,
    state::AppState,
};

pub fn shopping_routes() -> Router<AppState> {
    Router::new()
        .route("/shopping-list", get(get_shopping_list))
        .route("/shopping-list-items", get(list_items).post(upsert_item))
        .route("/shopping-list-items/:id", put(update_item).delete(delete_item))
}

#[instrument(skip(state))]
pub async fn get_shopping_list(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<RangeQuery>,
) -> AppResult<Json<Vec<ShoppingItem>>> {
    let range = q.validate()?;
    let items = services::shopping_list(&state.db, user_id, &range).await?;
    Ok(Json(items))
}

#[instrument(skip(state))]
pub async fn list_items(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<RangeQuery>,
) -> AppResult<Json<Vec<ShoppingListItem>>> {
    let range = q.validate()?;
    let rows = repo::list_for_range(&state.db, user_id, &range).await?;
    Ok(Json(rows.into_iter().map(ShoppingListItem::from).collect()))
}

/// Creates the override for (ingredient, range), or replaces the existing one.
#[instrument(skip(state, body))]
pub async fn upsert_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CreateItemRequest>,
) -> AppResult<Json<ShoppingListItem>> {
    let item = body.validate()?;
    if let IngredientRef::Id(id) = item.ingredient {
        if !ingredients::repo::exists(&state.db, id).await? {
            return Err(AppError::validation("ingredientId references an unknown ingredient"));
        }
    }
    services::check_recipe_ids(&state.db, user_id, &item.recipe_ids).await?;

    let row = repo::upsert(&state.db, user_id, &item).await?;
    info!(
        %user_id,
        item_id = %row.id,
        ingredient_id = %row.ingredient_id,
        checked = row.checked,
        "shopping list item saved"
    );
    Ok(Json(row.into()))
}

#[instrument(skip(state, body))]
pub async fn update_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateItemRequest>,
) -> AppResult<Json<ShoppingListItem>> {
    let patch = body.validate()?;
    services::load_owned(&state.db, user_id, id).await?;
    if let Some(ids) = &patch.recipe_ids {
        services::check_recipe_ids(&state.db, user_id, ids).await?;
    }

    let row = repo::update(&state.db, id, &patch).await?;
    info!(%user_id, item_id = %id, checked = row.checked, "shopping list item updated");
    Ok(Json(row.into()))
}

#[instrument(skip(state))]
pub async fn delete_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    services::load_owned(&state.db, user_id, id).await?;
    repo::delete(&state.db, id).await?;
    info!(%user_id, item_id = %id, "shopping list item deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::Method;
    use serde_json::json;

    use super::*;
    use crate::testing::{request, token_for};

    #[tokio::test]
    async fn shopping_list_requires_a_session() {
        let state = AppState::fake();
        let (status, _) = request(
            &state,
            Method::GET,
            "/api/shopping-list?startDate=2024-06-03&endDate=2024-06-09",
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn reversed_range_is_rejected_before_aggregation() {
        let state = AppState::fake();
        let token = token_for(&state, Uuid::new_v4());
        let (status, body) = request(
            &state,
            Method::GET,
            "/api/shopping-list?startDate=2024-06-09&endDate=2024-06-03",
            None,
            Some(&token),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.unwrap()["errors"].is_array());
    }

    #[tokio::test]
    async fn overlong_range_is_rejected() {
        let state = AppState::fake();
        let token = token_for(&state, Uuid::new_v4());
        let (status, _) = request(
            &state,
            Method::GET,
            "/api/shopping-list?startDate=2024-06-01&endDate=2024-07-15",
            None,
            Some(&token),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn item_without_ingredient_is_rejected() {
        let state = AppState::fake();
        let token = token_for(&state, Uuid::new_v4());
        let (status, body) = request(
            &state,
            Method::POST,
            "/api/shopping-list-items",
            Some(json!({ "startDate": "2024-06-03", "endDate": "2024-06-09", "checked": true })),
            Some(&token),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.unwrap()["errors"][0], "ingredientId or name is required");
    }

    #[tokio::test]
    async fn negative_quantity_update_is_rejected() {
        let state = AppState::fake();
        let token = token_for(&state, Uuid::new_v4());
        let path = format!("/api/shopping-list-items/{}", Uuid::new_v4());
        let (status, _) = request(&state, Method::PUT, &path, Some(json!({ "quantity": -1 })), Some(&token)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn clearing_and_setting_a_quantity_together_is_rejected() {
        let state = AppState::fake();
        let token = token_for(&state, Uuid::new_v4());
        let path = format!("/api/shopping-list-items/{}", Uuid::new_v4());
        let (status, body) = request(
            &state,
            Method::PUT,
            &path,
            Some(json!({ "quantity": 2, "clearQuantity": true })),
            Some(&token),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.unwrap()["errors"][0], "quantity and clearQuantity are exclusive");
    }
}
