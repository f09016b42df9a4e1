use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::Row;
use time::OffsetDateTime;
use uuid::Uuid;

/// Review aggregates, denormalized onto the product row and recomputed
/// whenever a review is written or deleted.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Rating {
    pub total: i64,
    pub sum: f64,
    pub avg: f64,
}

impl Rating {
    /// Average rounded to two decimals, matching what review writes store.
    pub fn average(total: i64, sum: f64) -> f64 {
        if total == 0 {
            0.0
        } else {
            (sum / total as f64 * 100.0).round() / 100.0
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub title: String,
    pub price: f64,
    pub description: String,
    pub image: String,
    pub category: String,
    pub rating: Rating,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Product {
    pub fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            price: row.try_get("price")?,
            description: row.try_get("description")?,
            image: row.try_get("image")?,
            category: row.try_get("category")?,
            rating: Rating {
                total: row.try_get("rating_total")?,
                sum: row.try_get("rating_sum")?,
                avg: row.try_get("rating_avg")?,
            },
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}
