use std::sync::Arc;

use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::response::IntoResponse;
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::product::Product;
use crate::error::ApiError;
use crate::middleware::{require_auth, CurrentUser};
use crate::state::AppState;

/// The whole cart surface sits behind the bearer middleware.
pub fn router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/cart", get(list).post(add).delete(clear))
        .route("/cart/{product_id}", patch(set_quantity).delete(remove))
        .layer(from_fn_with_state(state, require_auth))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CartEntry {
    product_id: Uuid,
    quantity: i32,
    /// `None` when the product was deleted after being added to the cart.
    product: Option<Product>,
}

async fn list(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<CartEntry>>, ApiError> {
    let rows = sqlx::query(
        "SELECT c.product_id, c.quantity,
                p.id, p.title, p.price, p.description, p.image, p.category,
                p.rating_total, p.rating_sum, p.rating_avg, p.created_at, p.updated_at
         FROM cart_items c
         LEFT JOIN products p ON p.id = c.product_id
         WHERE c.user_id = $1
         ORDER BY c.updated_at DESC",
    )
    .bind(user.0)
    .fetch_all(&state.db)
    .await?;

    let mut entries = Vec::with_capacity(rows.len());
    for row in &rows {
        let product = match row.try_get::<Option<Uuid>, _>("id")? {
            Some(_) => Some(Product::from_row(row)?),
            None => None,
        };
        entries.push(CartEntry {
            product_id: row.try_get("product_id")?,
            quantity: row.try_get("quantity")?,
            product,
        });
    }
    Ok(Json(entries))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddPayload {
    product_id: Uuid,
    #[serde(default = "default_quantity")]
    quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

async fn add(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<AddPayload>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.quantity < 1 {
        return Err(ApiError::BadRequest("quantity must be at least 1".into()));
    }
    let exists = sqlx::query("SELECT 1 FROM products WHERE id = $1")
        .bind(payload.product_id)
        .fetch_optional(&state.db)
        .await?
        .is_some();
    if !exists {
        return Err(ApiError::NotFound("product not found".into()));
    }

    // adding the same product again accumulates its quantity
    let row = sqlx::query(
        "INSERT INTO cart_items (user_id, product_id, quantity, updated_at)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (user_id, product_id)
         DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity,
                       updated_at = EXCLUDED.updated_at
         RETURNING quantity",
    )
    .bind(user.0)
    .bind(payload.product_id)
    .bind(payload.quantity)
    .bind(OffsetDateTime::now_utc())
    .fetch_one(&state.db)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "productId": payload.product_id,
            "quantity": row.try_get::<i32, _>("quantity")?,
        })),
    ))
}

#[derive(Deserialize)]
struct QuantityPayload {
    quantity: i32,
}

async fn set_quantity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<QuantityPayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if payload.quantity < 1 {
        return Err(ApiError::BadRequest("quantity must be at least 1".into()));
    }
    let result = sqlx::query(
        "UPDATE cart_items SET quantity = $3, updated_at = $4
         WHERE user_id = $1 AND product_id = $2",
    )
    .bind(user.0)
    .bind(product_id)
    .bind(payload.quantity)
    .bind(OffsetDateTime::now_utc())
    .execute(&state.db)
    .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("product is not in the cart".into()));
    }
    Ok(Json(serde_json::json!({
        "productId": product_id,
        "quantity": payload.quantity,
    })))
}

async fn remove(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(product_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
        .bind(user.0)
        .bind(product_id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("product is not in the cart".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn clear(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<StatusCode, ApiError> {
    sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
        .bind(user.0)
        .execute(&state.db)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
