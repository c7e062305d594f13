//! Router-level helpers for handler tests.

use axum::{
    body::Body,
    extract::FromRef,
    http::{header, Method, Request, StatusCode},
};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use crate::{app::build_app, auth::jwt::JwtKeys, state::AppState};

pub fn token_for(state: &AppState, user_id: Uuid) -> String {
    JwtKeys::from_ref(state).sign_access(user_id).expect("sign access")
}

/// Sends one request through the full router and decodes a JSON body if any.
pub async fn request(
    state: &AppState,
    method: Method,
    path: &str,
    body: Option<Value>,
    token: Option<&str>,
) -> (StatusCode, Option<Value>) {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    send(state, request).await
}

pub async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, Option<Value>) {
    let response = build_app(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        None
    } else {
        serde_json::from_slice(&bytes).ok()
    };
    (status, json)
}
