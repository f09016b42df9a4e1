use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use sqlx::{QueryBuilder, Row};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::product::Product;
use crate::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/products", get(list).post(create))
        .route("/products/categories", get(distinct_categories))
        .route("/products/category/{category}", get(list_by_category))
        .route("/products/{id}", get(fetch).patch(update).delete(remove))
}

const PRODUCT_COLUMNS: &str = "id, title, price, description, image, category, \
     rating_total, rating_sum, rating_avg, created_at, updated_at";

#[derive(Deserialize, Default)]
#[serde(default)]
struct ListQuery {
    search: Option<String>,
    sort: Option<String>,
    limit: Option<i64>,
}

// Whitelisted ORDER BY clauses; anything else falls back to insertion order.
fn order_clause(sort: Option<&str>) -> &'static str {
    match sort {
        Some("price_asc") => " ORDER BY price ASC",
        Some("price_desc") => " ORDER BY price DESC",
        Some("title_asc") => " ORDER BY title ASC",
        Some("title_desc") => " ORDER BY title DESC",
        _ => " ORDER BY created_at ASC",
    }
}

async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let mut qb = QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products"));
    if let Some(term) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = format!("%{}%", term.trim());
        qb.push(" WHERE (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    qb.push(order_clause(query.sort.as_deref()));
    if let Some(limit) = query.limit.filter(|l| *l > 0) {
        qb.push(" LIMIT ").push_bind(limit);
    }

    let rows = qb.build().fetch_all(&state.db).await?;
    let products = rows.iter().map(Product::from_row).collect::<Result<_, _>>()?;
    Ok(Json(products))
}

async fn list_by_category(
    State(state): State<Arc<AppState>>,
    Path(category): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE category = "
    ));
    qb.push_bind(category);
    qb.push(order_clause(query.sort.as_deref()));
    if let Some(limit) = query.limit.filter(|l| *l > 0) {
        qb.push(" LIMIT ").push_bind(limit);
    }

    let rows = qb.build().fetch_all(&state.db).await?;
    let products = rows.iter().map(Product::from_row).collect::<Result<_, _>>()?;
    Ok(Json(products))
}

async fn distinct_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<String>>, ApiError> {
    let rows = sqlx::query("SELECT DISTINCT category FROM products ORDER BY category")
        .fetch_all(&state.db)
        .await?;
    let categories = rows
        .iter()
        .map(|r| r.try_get("category"))
        .collect::<Result<_, _>>()?;
    Ok(Json(categories))
}

async fn fetch(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Product>, ApiError> {
    let row = sqlx::query(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::NotFound("product not found".into()))?;
    Ok(Json(Product::from_row(&row)?))
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct CreateProduct {
    title: String,
    price: Option<f64>,
    description: String,
    image: String,
    category: String,
}

fn validate_price(price: f64) -> Result<f64, ApiError> {
    if !price.is_finite() || price < 0.0 {
        return Err(ApiError::BadRequest(
            "price must be a number greater than or equal to 0".into(),
        ));
    }
    Ok(price)
}

async fn create(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateProduct>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::BadRequest("title is required".into()));
    }
    if payload.category.trim().is_empty() {
        return Err(ApiError::BadRequest("category is required".into()));
    }
    let price = validate_price(
        payload
            .price
            .ok_or_else(|| ApiError::BadRequest("price is required".into()))?,
    )?;

    let id = Uuid::new_v4();
    let now = OffsetDateTime::now_utc();
    let row = sqlx::query(&format!(
        "INSERT INTO products (id, title, price, description, image, category, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
         RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(id)
    .bind(payload.title.trim())
    .bind(price)
    .bind(&payload.description)
    .bind(&payload.image)
    .bind(payload.category.trim())
    .bind(now)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(Product::from_row(&row)?)))
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct UpdateProduct {
    title: Option<String>,
    price: Option<f64>,
    description: Option<String>,
    image: Option<String>,
    category: Option<String>,
}

async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProduct>,
) -> Result<Json<Product>, ApiError> {
    if payload.title.is_none()
        && payload.price.is_none()
        && payload.description.is_none()
        && payload.image.is_none()
        && payload.category.is_none()
    {
        return Err(ApiError::BadRequest("no updatable fields provided".into()));
    }

    let mut qb = QueryBuilder::new("UPDATE products SET updated_at = ");
    qb.push_bind(OffsetDateTime::now_utc());
    if let Some(title) = &payload.title {
        if title.trim().is_empty() {
            return Err(ApiError::BadRequest("title must not be empty".into()));
        }
        qb.push(", title = ").push_bind(title.trim().to_string());
    }
    if let Some(price) = payload.price {
        qb.push(", price = ").push_bind(validate_price(price)?);
    }
    if let Some(description) = &payload.description {
        qb.push(", description = ").push_bind(description.clone());
    }
    if let Some(image) = &payload.image {
        qb.push(", image = ").push_bind(image.clone());
    }
    if let Some(category) = &payload.category {
        if category.trim().is_empty() {
            return Err(ApiError::BadRequest("category must not be empty".into()));
        }
        qb.push(", category = ").push_bind(category.trim().to_string());
    }
    qb.push(" WHERE id = ").push_bind(id);
    qb.push(format!(" RETURNING {PRODUCT_COLUMNS}"));

    let row = qb
        .build()
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("product not found".into()))?;
    Ok(Json(Product::from_row(&row)?))
}

async fn remove(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("product not found".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}
