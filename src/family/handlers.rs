use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::dto::{
    CreatePreferenceRequest, DietaryPreference, FamilyMember, MemberRequest, PreferenceLink,
};
use super::{repo, services};
use crate::{
    auth::AuthUser,
    dates,
    error::{AppError, AppResult},
    state::AppState,
};

pub fn family_routes() -> Router<AppState> {
    Router::new()
        .route("/family-members", get(list_members).post(create_member))
        .route(
            "/family-members/:id",
            put(update_member).delete(delete_member),
        )
        .route("/family-members/:id/preferences", post(add_preference))
        .route(
            "/family-members/:id/preferences/:preference_id",
            delete(remove_preference),
        )
        .route(
            "/dietary-preferences",
            get(list_preferences).post(create_preference),
        )
}

#[instrument(skip(state))]
pub async fn list_members(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Vec<FamilyMember>>> {
    let rows = repo::list_members(&state.db, user_id).await?;
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let prefs = repo::member_preferences(&state.db, &ids).await?;
    Ok(Json(services::assemble(rows, prefs)?))
}

#[instrument(skip(state, body))]
pub async fn create_member(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<MemberRequest>,
) -> AppResult<(StatusCode, Json<FamilyMember>)> {
    let body = services::validate_member(body, dates::today())?;
    let links = body.dietary_preferences.unwrap_or_default();
    services::check_links(&state.db, &links).await?;

    let id = repo::create_member(
        &state.db,
        user_id,
        &body.name,
        body.birth_date,
        body.is_guest,
        &links,
    )
    .await?;
    info!(%user_id, member_id = %id, is_guest = body.is_guest, "family member added");

    let row = services::load_owned(&state.db, user_id, id).await?;
    Ok((StatusCode::CREATED, Json(services::load_full(&state.db, row).await?)))
}

#[instrument(skip(state, body))]
pub async fn update_member(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<MemberRequest>,
) -> AppResult<Json<FamilyMember>> {
    let body = services::validate_member(body, dates::today())?;
    services::load_owned(&state.db, user_id, id).await?;
    if let Some(links) = &body.dietary_preferences {
        services::check_links(&state.db, links).await?;
    }

    repo::update_member(
        &state.db,
        id,
        &body.name,
        body.birth_date,
        body.is_guest,
        body.dietary_preferences.as_deref(),
    )
    .await?;
    info!(%user_id, member_id = %id, "family member updated");

    let row = services::load_owned(&state.db, user_id, id).await?;
    Ok(Json(services::load_full(&state.db, row).await?))
}

#[instrument(skip(state))]
pub async fn delete_member(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    services::load_owned(&state.db, user_id, id).await?;
    repo::delete_member(&state.db, id).await?;
    info!(%user_id, member_id = %id, "family member removed");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, body))]
pub async fn add_preference(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<PreferenceLink>,
) -> AppResult<Json<FamilyMember>> {
    let row = services::load_owned(&state.db, user_id, id).await?;
    services::check_links(&state.db, std::slice::from_ref(&body)).await?;
    let notes = body.notes.as_deref().map(str::trim).filter(|n| !n.is_empty());
    repo::link_preference(&state.db, id, body.preference_id, notes).await?;
    Ok(Json(services::load_full(&state.db, row).await?))
}

#[instrument(skip(state))]
pub async fn remove_preference(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((id, preference_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    services::load_owned(&state.db, user_id, id).await?;
    if !repo::unlink_preference(&state.db, id, preference_id).await? {
        return Err(AppError::NotFound("dietary preference"));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn list_preferences(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
) -> AppResult<Json<Vec<DietaryPreference>>> {
    let rows = repo::list_catalog(&state.db).await?;
    let prefs = rows
        .into_iter()
        .map(DietaryPreference::try_from)
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(Json(prefs))
}

#[instrument(skip(state, body))]
pub async fn create_preference(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CreatePreferenceRequest>,
) -> AppResult<(StatusCode, Json<DietaryPreference>)> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(AppError::validation("name is required"));
    }
    let description = body.description.as_deref().map(str::trim).filter(|d| !d.is_empty());

    let row = repo::create_catalog_entry(&state.db, name, body.pref_type, description)
        .await?
        .ok_or_else(|| AppError::Conflict(format!("dietary preference {name} already exists")))?;
    info!(%user_id, preference_id = %row.id, "dietary preference added");
    Ok((StatusCode::CREATED, Json(DietaryPreference::try_from(row)?)))
}

#[cfg(test)]
mod tests {
    use axum::http::Method;
    use serde_json::json;

    use super::*;
    use crate::testing::{request, token_for};

    #[tokio::test]
    async fn members_require_a_session() {
        let state = AppState::fake();
        let (status, _) = request(&state, Method::GET, "/api/family-members", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn future_birth_date_is_rejected_before_saving() {
        let state = AppState::fake();
        let token = token_for(&state, Uuid::new_v4());
        let (status, body) = request(
            &state,
            Method::POST,
            "/api/family-members",
            Some(json!({ "name": "Kid", "birthDate": "2999-01-01" })),
            Some(&token),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.unwrap()["errors"][0].as_str().unwrap().contains("birthDate"));
    }

    #[tokio::test]
    async fn blank_preference_name_is_rejected() {
        let state = AppState::fake();
        let token = token_for(&state, Uuid::new_v4());
        let (status, _) = request(
            &state,
            Method::POST,
            "/api/dietary-preferences",
            Some(json!({ "name": "  ", "type": "ALLERGY" })),
            Some(&token),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
