use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::dto::{MealPlan, MealPlanRequest, PlanListQuery, SlotEditRequest};
use super::{repo, services};
use crate::{
    auth::AuthUser,
    dates::DateRange,
    error::{ensure_owner, AppError, AppResult},
    state::AppState,
};

pub fn meal_plan_routes() -> Router<AppState> {
    Router::new()
        .route("/meal-plans", get(list_plans).post(create_plan))
        .route(
            "/meal-plans/:id",
            get(get_plan).put(update_plan).delete(delete_plan),
        )
        .route("/meal-plans/:id/slots", put(edit_slot))
}

#[instrument(skip(state))]
pub async fn list_plans(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<PlanListQuery>,
) -> AppResult<Json<Vec<MealPlan>>> {
    let rows = match (q.start_date, q.end_date) {
        (Some(start), Some(end)) => {
            let range = DateRange::new(start, end)?;
            repo::list_overlapping(&state.db, user_id, &range).await?
        }
        (None, None) => repo::list_by_user(&state.db, user_id).await?,
        _ => {
            return Err(AppError::validation(
                "startDate and endDate must be given together",
            ))
        }
    };
    let members = services::member_snapshot(&state.db, user_id).await?;
    Ok(Json(
        rows.into_iter()
            .map(|row| services::view(row, &members))
            .collect(),
    ))
}

#[instrument(skip(state))]
pub async fn get_plan(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MealPlan>> {
    let row = services::load_owned(&state.db, user_id, id).await?;
    let members = services::member_snapshot(&state.db, user_id).await?;
    Ok(Json(services::view(row, &members)))
}

#[instrument(skip(state, body))]
pub async fn create_plan(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<MealPlanRequest>,
) -> AppResult<(StatusCode, Json<MealPlan>)> {
    let range = DateRange::new(body.week_start, body.week_end)?;
    let days = services::normalize_days(&range, body.days)?;
    services::check_references(&state.db, user_id, &days).await?;

    let row = repo::create(&state.db, user_id, &range, &days).await?;
    info!(%user_id, plan_id = %row.id, week_start = %range.start_date, "meal plan created");

    let members = services::member_snapshot(&state.db, user_id).await?;
    Ok((StatusCode::CREATED, Json(services::view(row, &members))))
}

#[instrument(skip(state, body))]
pub async fn update_plan(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<MealPlanRequest>,
) -> AppResult<Json<MealPlan>> {
    let range = DateRange::new(body.week_start, body.week_end)?;
    let days = services::normalize_days(&range, body.days)?;
    services::load_owned(&state.db, user_id, id).await?;
    services::check_references(&state.db, user_id, &days).await?;

    let row = repo::update(&state.db, id, &range, &days).await?;
    info!(%user_id, plan_id = %id, "meal plan updated");

    let members = services::member_snapshot(&state.db, user_id).await?;
    Ok(Json(services::view(row, &members)))
}

#[instrument(skip(state, body))]
pub async fn edit_slot(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<SlotEditRequest>,
) -> AppResult<Json<MealPlan>> {
    let row = services::load_owned(&state.db, user_id, id).await?;
    let range = DateRange {
        start_date: row.week_start,
        end_date: row.week_end,
    };
    let mut days = row.days.0;
    let (date, meal_type) = (body.date, body.meal_type);
    services::apply_slot_edit(&range, &mut days, body)?;
    services::check_references(&state.db, user_id, &days).await?;

    let row = repo::update(&state.db, id, &range, &days).await?;
    info!(%user_id, plan_id = %id, %date, ?meal_type, "meal slot edited");

    let members = services::member_snapshot(&state.db, user_id).await?;
    Ok(Json(services::view(row, &members)))
}

#[instrument(skip(state))]
pub async fn delete_plan(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let owner = repo::find(&state.db, id).await?.map(|r| r.user_id);
    ensure_owner("meal plan", owner, user_id)?;
    repo::delete(&state.db, id).await?;
    info!(%user_id, plan_id = %id, "meal plan deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::Method;
    use serde_json::json;

    use super::*;
    use crate::testing::{request, token_for};

    async fn post_plan(state: &AppState, body: serde_json::Value) -> (StatusCode, Option<serde_json::Value>) {
        let token = token_for(state, Uuid::new_v4());
        request(state, Method::POST, "/api/meal-plans", Some(body), Some(&token)).await
    }

    #[tokio::test]
    async fn plans_require_a_session() {
        let state = AppState::fake();
        let (status, _) = request(&state, Method::GET, "/api/meal-plans", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn reversed_week_is_rejected_before_persistence() {
        let state = AppState::fake();
        let (status, body) = post_plan(
            &state,
            json!({ "weekStart": "2024-06-09", "weekEnd": "2024-06-03" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.unwrap()["errors"].is_array());
    }

    #[tokio::test]
    async fn span_over_thirty_days_is_rejected_before_persistence() {
        let state = AppState::fake();
        let (status, _) = post_plan(
            &state,
            json!({ "weekStart": "2024-06-01", "weekEnd": "2024-07-15" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn day_outside_the_week_is_rejected() {
        let state = AppState::fake();
        let (status, _) = post_plan(
            &state,
            json!({
                "weekStart": "2024-06-03",
                "weekEnd": "2024-06-09",
                "days": [{ "date": "2024-06-12", "meals": {} }]
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn list_range_is_validated() {
        let state = AppState::fake();
        let token = token_for(&state, Uuid::new_v4());
        let (status, _) = request(
            &state,
            Method::GET,
            "/api/meal-plans?startDate=2024-06-01&endDate=2024-08-01",
            None,
            Some(&token),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = request(
            &state,
            Method::GET,
            "/api/meal-plans?startDate=2024-06-01",
            None,
            Some(&token),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
