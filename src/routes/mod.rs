use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

mod auth;
mod cart;
mod categories;
mod products;
mod reviews;

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .merge(auth::router())
        .merge(products::router())
        .merge(categories::router())
        .merge(cart::router(state.clone()))
        .merge(reviews::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn index() -> Json<serde_json::Value> {
    Json(json!({
        "name": "fakestore-api",
        "resources": ["/auth", "/products", "/categories", "/cart", "/reviews"],
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
