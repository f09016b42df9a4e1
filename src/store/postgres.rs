use std::sync::Arc;

use async_trait::async_trait;
use sqlx::Row;

use crate::domain::token::{ConsumedToken, RefreshTokenRecord};
use crate::domain::user::User;
use crate::infra::clock::Clock;
use crate::infra::db::Db;

use super::{RefreshTokenLedger, StoreError, UserStore};

pub struct PgUserStore {
    db: Db,
}

impl PgUserStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(
            "SELECT id, name, email, password_hash, created_at, updated_at
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;

        let user = row
            .map(|r| -> Result<User, sqlx::Error> {
                Ok(User {
                    id: r.try_get("id")?,
                    name: r.try_get("name")?,
                    email: r.try_get("email")?,
                    password_hash: r.try_get("password_hash")?,
                    created_at: r.try_get("created_at")?,
                    updated_at: r.try_get("updated_at")?,
                })
            })
            .transpose()?;
        Ok(user)
    }

    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.db)
        .await
        .map_err(map_insert_error)?;
        Ok(())
    }
}

// A constraint violation on users can only be the unique email index.
fn map_insert_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.constraint().is_some() {
            return StoreError::Duplicate;
        }
    }
    StoreError::from(err)
}

pub struct PgRefreshTokenLedger {
    db: Db,
    clock: Arc<dyn Clock>,
}

impl PgRefreshTokenLedger {
    pub fn new(db: Db, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }
}

#[async_trait]
impl RefreshTokenLedger for PgRefreshTokenLedger {
    async fn store(&self, record: RefreshTokenRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO refresh_tokens (token_hash, user_id, expires_at, created_at)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(&record.token_hash)
        .bind(record.user_id)
        .bind(record.expires_at)
        .bind(record.created_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn consume(&self, token_hash: &str) -> Result<ConsumedToken, StoreError> {
        // One statement: of N racing consumers exactly one gets the row back.
        let row = sqlx::query(
            "DELETE FROM refresh_tokens WHERE token_hash = $1
             RETURNING user_id, expires_at",
        )
        .bind(token_hash)
        .fetch_optional(&self.db)
        .await?
        .ok_or(StoreError::NotFound)?;

        let consumed = ConsumedToken {
            user_id: row.try_get("user_id")?,
            expires_at: row.try_get("expires_at")?,
        };
        if consumed.expires_at < self.clock.now() {
            return Err(StoreError::Expired);
        }
        Ok(consumed)
    }

    async fn delete(&self, token_hash: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM refresh_tokens WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}
