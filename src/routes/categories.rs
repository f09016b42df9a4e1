use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use sqlx::QueryBuilder;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::category::{slugify, Category};
use crate::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/categories", get(list).post(create))
        .route("/categories/{id}", get(fetch).patch(update).delete(remove))
}

const CATEGORY_COLUMNS: &str = "id, name, slug, description, created_at, updated_at";

async fn list(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Category>>, ApiError> {
    let rows = sqlx::query(&format!(
        "SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY name"
    ))
    .fetch_all(&state.db)
    .await?;
    let categories = rows.iter().map(Category::from_row).collect::<Result<_, _>>()?;
    Ok(Json(categories))
}

async fn fetch(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Category>, ApiError> {
    let row = sqlx::query(&format!(
        "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::NotFound("category not found".into()))?;
    Ok(Json(Category::from_row(&row)?))
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct CreateCategory {
    name: String,
    description: String,
}

async fn create(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateCategory>,
) -> Result<impl IntoResponse, ApiError> {
    let slug = slugify(&payload.name);
    if slug.is_empty() {
        return Err(ApiError::BadRequest("name is required".into()));
    }

    let id = Uuid::new_v4();
    let now = OffsetDateTime::now_utc();
    let row = sqlx::query(&format!(
        "INSERT INTO categories (id, name, slug, description, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $5)
         RETURNING {CATEGORY_COLUMNS}"
    ))
    .bind(id)
    .bind(payload.name.trim())
    .bind(&slug)
    .bind(&payload.description)
    .bind(now)
    .fetch_one(&state.db)
    .await
    .map_err(map_slug_conflict)?;

    Ok((StatusCode::CREATED, Json(Category::from_row(&row)?)))
}

fn map_slug_conflict(err: sqlx::Error) -> ApiError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.constraint().is_some() {
            return ApiError::Conflict("a category with this name already exists".into());
        }
    }
    ApiError::Database(err)
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct UpdateCategory {
    name: Option<String>,
    description: Option<String>,
}

async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCategory>,
) -> Result<Json<Category>, ApiError> {
    if payload.name.is_none() && payload.description.is_none() {
        return Err(ApiError::BadRequest("no updatable fields provided".into()));
    }

    let mut qb = QueryBuilder::new("UPDATE categories SET updated_at = ");
    qb.push_bind(OffsetDateTime::now_utc());
    if let Some(name) = &payload.name {
        // renaming re-derives the slug
        let slug = slugify(name);
        if slug.is_empty() {
            return Err(ApiError::BadRequest("name must not be empty".into()));
        }
        qb.push(", name = ").push_bind(name.trim().to_string());
        qb.push(", slug = ").push_bind(slug);
    }
    if let Some(description) = &payload.description {
        qb.push(", description = ").push_bind(description.clone());
    }
    qb.push(" WHERE id = ").push_bind(id);
    qb.push(format!(" RETURNING {CATEGORY_COLUMNS}"));

    let row = qb
        .build()
        .fetch_optional(&state.db)
        .await
        .map_err(map_slug_conflict)?
        .ok_or_else(|| ApiError::NotFound("category not found".into()))?;
    Ok(Json(Category::from_row(&row)?))
}

async fn remove(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let result = sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("category not found".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}
