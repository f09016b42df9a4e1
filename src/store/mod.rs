use async_trait::async_trait;
use thiserror::Error;

use crate::domain::token::{ConsumedToken, RefreshTokenRecord};
use crate::domain::user::User;

pub mod memory;
pub mod postgres;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("record expired")]
    Expired,
    #[error("duplicate record")]
    Duplicate,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// Credential store for registered users. Email lookup is exact and
/// case-sensitive; uniqueness is enforced by the store itself, so racing
/// registrations collapse to a single winner and a `Duplicate` loser.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn insert(&self, user: &User) -> Result<(), StoreError>;
}

/// Persistent single-use refresh-token state, keyed by token digest.
#[async_trait]
pub trait RefreshTokenLedger: Send + Sync {
    /// Record a freshly issued token.
    async fn store(&self, record: RefreshTokenRecord) -> Result<(), StoreError>;

    /// Look up and delete in one atomic step. Of N concurrent calls with
    /// the same digest at most one wins; the rest see `NotFound`. A
    /// found-but-expired entry is removed and reported as `Expired`.
    async fn consume(&self, token_hash: &str) -> Result<ConsumedToken, StoreError>;

    /// Idempotent removal; deleting an absent token is not an error.
    async fn delete(&self, token_hash: &str) -> Result<(), StoreError>;
}
