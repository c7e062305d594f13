use axum::{
    extract::{FromRef, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RefreshRequest, RegisterRequest},
        extractors::{session_clear_cookie, session_set_cookie, AuthUser},
        jwt::{JwtKeys, TokenKind},
        password::{hash_password, is_valid_email, validate_registration, verify_password},
        repo,
        repo_types::UserRow,
    },
    error::{AppError, AppResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/refresh", post(refresh))
        .route("/auth/user", get(get_user))
}

/// Signs a token pair and sets the access token as the session cookie.
fn issue_session(keys: &JwtKeys, user: UserRow) -> AppResult<(HeaderMap, Json<AuthResponse>)> {
    let access_token = keys.sign_access(user.id).map_err(|e| {
        error!(error = %e, "jwt sign access failed");
        AppError::Internal(e)
    })?;
    let refresh_token = keys.sign_refresh(user.id).map_err(|e| {
        error!(error = %e, "jwt sign refresh failed");
        AppError::Internal(e)
    })?;

    let mut headers = HeaderMap::new();
    let cookie = session_set_cookie(&access_token, keys.access_ttl.as_secs());
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie).map_err(|e| AppError::Internal(e.into()))?,
    );

    Ok((
        headers,
        Json(AuthResponse {
            access_token,
            refresh_token,
            user: PublicUser {
                id: user.id,
                email: user.email,
            },
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, HeaderMap, Json<AuthResponse>)> {
    let email = validate_registration(&payload.email, &payload.password).map_err(|e| {
        warn!(error = %e, "registration rejected");
        e
    })?;

    let hash = hash_password(&payload.password)?;
    let Some(user) = repo::create(&state.db, &email, &hash).await? else {
        warn!(email = %email, "email already registered");
        return Err(AppError::Conflict("Email already registered".into()));
    };

    info!(user_id = %user.id, email = %user.email, "user registered");
    let (headers, body) = issue_session(&JwtKeys::from_ref(&state), user)?;
    Ok((StatusCode::CREATED, headers, body))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<(HeaderMap, Json<AuthResponse>)> {
    let email = payload.email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(AppError::validation("Invalid email"));
    }

    let user = match repo::find_by_email(&state.db, &email).await? {
        Some(u) => u,
        None => {
            warn!(email = %email, "login unknown email");
            return Err(AppError::Unauthorized("Invalid credentials".into()));
        }
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    info!(user_id = %user.id, "user logged in");
    issue_session(&JwtKeys::from_ref(&state), user)
}

#[instrument]
pub async fn logout() -> (StatusCode, HeaderMap) {
    let mut headers = HeaderMap::new();
    if let Ok(v) = HeaderValue::from_str(&session_clear_cookie()) {
        headers.insert(header::SET_COOKIE, v);
    }
    (StatusCode::NO_CONTENT, headers)
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> AppResult<(HeaderMap, Json<AuthResponse>)> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_kind(&payload.refresh_token, TokenKind::Refresh)
        .map_err(|e| AppError::Unauthorized(e.to_string()))?;

    let user = repo::find(&state.db, claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;
    issue_session(&keys, user)
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<PublicUser>> {
    let user = repo::find(&state.db, user_id).await?.ok_or_else(|| {
        error!(user_id = %user_id, "user not found");
        AppError::Unauthorized("User not found".into())
    })?;

    Ok(Json(PublicUser {
        id: user.id,
        email: user.email,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::request;
    use axum::http::Method;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn public_user_serialization() {
        let response = PublicUser {
            id: Uuid::new_v4(),
            email: "test@example.com".to_string(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("test@example.com"));
    }

    #[tokio::test]
    async fn user_requires_a_session() {
        let state = AppState::fake();
        let (status, _) = request(&state, Method::GET, "/api/auth/user", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn refresh_token_cannot_open_the_api() {
        let state = AppState::fake();
        let refresh = JwtKeys::from_ref(&state).sign_refresh(Uuid::new_v4()).unwrap();
        let (status, _) =
            request(&state, Method::GET, "/api/auth/user", None, Some(&refresh)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn register_validates_before_touching_the_database() {
        let state = AppState::fake();
        let (status, body) = request(
            &state,
            Method::POST,
            "/api/auth/register",
            Some(json!({ "email": "bad", "password": "123" })),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.unwrap()["errors"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn logout_returns_no_content() {
        let state = AppState::fake();
        let (status, _) = request(&state, Method::POST, "/api/auth/logout", None, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
}
