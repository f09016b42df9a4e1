use std::sync::Arc;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Verified caller identity. Injected into request extensions by
/// `require_auth`, or extracted directly from the bearer header on routes
/// that mix public and protected methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub Uuid);

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(*user);
        }
        let token = bearer_from_header(&parts.headers)
            .ok_or_else(|| ApiError::Unauthorized("missing access token".into()))?;
        Ok(CurrentUser(state.auth.verify_access(&token)?))
    }
}

pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_from_header(req.headers())
        .ok_or_else(|| ApiError::Unauthorized("missing access token".into()))?;
    let user_id = state.auth.verify_access(&token)?;
    req.extensions_mut().insert(CurrentUser(user_id));
    Ok(next.run(req).await)
}

fn bearer_from_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}
