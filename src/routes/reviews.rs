use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ApiError;
use crate::infra::db::Db;
use crate::middleware::CurrentUser;
use crate::state::AppState;

/// Reads are public; writes extract `CurrentUser` from the bearer header.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route(
        "/reviews/{product_id}",
        get(list).post(upsert).delete(remove),
    )
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReviewEntry {
    id: Uuid,
    rating: i32,
    comment: String,
    reviewer: Reviewer,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    updated_at: OffsetDateTime,
}

#[derive(Serialize)]
struct Reviewer {
    id: Uuid,
    name: String,
}

async fn list(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<Vec<ReviewEntry>>, ApiError> {
    let rows = sqlx::query(
        "SELECT r.id, r.rating, r.comment, r.created_at, r.updated_at,
                r.user_id, COALESCE(u.name, 'deleted user') AS reviewer_name
         FROM reviews r
         LEFT JOIN users u ON u.id = r.user_id
         WHERE r.product_id = $1
         ORDER BY r.created_at DESC",
    )
    .bind(product_id)
    .fetch_all(&state.db)
    .await?;

    let mut reviews = Vec::with_capacity(rows.len());
    for row in &rows {
        reviews.push(ReviewEntry {
            id: row.try_get("id")?,
            rating: row.try_get("rating")?,
            comment: row.try_get("comment")?,
            reviewer: Reviewer {
                id: row.try_get("user_id")?,
                name: row.try_get("reviewer_name")?,
            },
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        });
    }
    Ok(Json(reviews))
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ReviewPayload {
    rating: Option<i32>,
    comment: String,
}

async fn upsert(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<ReviewPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let rating = payload
        .rating
        .ok_or_else(|| ApiError::BadRequest("rating is required".into()))?;
    if !(1..=5).contains(&rating) {
        return Err(ApiError::BadRequest("rating must be between 1 and 5".into()));
    }
    let exists = sqlx::query("SELECT 1 FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_optional(&state.db)
        .await?
        .is_some();
    if !exists {
        return Err(ApiError::NotFound("product not found".into()));
    }

    let now = OffsetDateTime::now_utc();
    sqlx::query(
        "INSERT INTO reviews (id, user_id, product_id, rating, comment, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $6)
         ON CONFLICT (user_id, product_id)
         DO UPDATE SET rating = EXCLUDED.rating,
                       comment = EXCLUDED.comment,
                       updated_at = EXCLUDED.updated_at",
    )
    .bind(Uuid::new_v4())
    .bind(user.0)
    .bind(product_id)
    .bind(rating)
    .bind(&payload.comment)
    .bind(now)
    .execute(&state.db)
    .await?;
    recompute_rating(&state.db, product_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "productId": product_id,
            "rating": rating,
            "comment": payload.comment,
        })),
    ))
}

async fn remove(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let result = sqlx::query("DELETE FROM reviews WHERE user_id = $1 AND product_id = $2")
        .bind(user.0)
        .bind(product_id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("review not found".into()));
    }
    recompute_rating(&state.db, product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Denormalized aggregates on the product row, recomputed after each write.
// The average is stored rounded to two decimals.
async fn recompute_rating(db: &Db, product_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE products p
         SET rating_total = s.total,
             rating_sum = s.sum,
             rating_avg = CASE WHEN s.total = 0 THEN 0
                          ELSE ROUND((s.sum / s.total)::numeric, 2)::double precision END,
             updated_at = $2
         FROM (SELECT COUNT(*) AS total,
                      COALESCE(SUM(rating), 0)::double precision AS sum
               FROM reviews WHERE product_id = $1) s
         WHERE p.id = $1",
    )
    .bind(product_id)
    .bind(OffsetDateTime::now_utc())
    .execute(db)
    .await?;
    Ok(())
}
