use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

// Fields default to empty so presence checks live in one place, the
// service, instead of in serde rejections.
#[derive(Deserialize, Default)]
#[serde(default)]
struct RegisterPayload {
    name: String,
    email: String,
    password: String,
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state
        .auth
        .register(&payload.name, &payload.email, &payload.password)
        .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct LoginPayload {
    email: String,
    password: String,
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.auth.login(&payload.email, &payload.password).await?;
    Ok(Json(session))
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct RefreshPayload {
    refresh_token: String,
}

async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RefreshPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let pair = state.auth.refresh(&payload.refresh_token).await?;
    Ok(Json(pair))
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct LogoutPayload {
    refresh_token: Option<String>,
}

async fn logout(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LogoutPayload>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(token) = payload.refresh_token.filter(|t| !t.is_empty()) {
        state.auth.logout(&token).await?;
    }
    Ok(Json(json!({ "message": "logged out" })))
}
