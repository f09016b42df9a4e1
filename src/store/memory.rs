use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::domain::token::{ConsumedToken, RefreshTokenRecord};
use crate::domain::user::User;
use crate::infra::clock::Clock;

use super::{RefreshTokenLedger, StoreError, UserStore};

/// In-memory user store for tests and local development. Keyed by email,
/// so the map itself enforces uniqueness.
#[derive(Default)]
pub struct MemoryUserStore {
    users: DashMap<String, User>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(email).map(|entry| entry.value().clone()))
    }

    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        // the entry holds its shard lock, so racing inserts of one email
        // collapse to a single winner
        match self.users.entry(user.email.clone()) {
            Entry::Occupied(_) => Err(StoreError::Duplicate),
            Entry::Vacant(slot) => {
                slot.insert(user.clone());
                Ok(())
            }
        }
    }
}

/// In-memory ledger; `DashMap::remove` provides the atomic consume.
pub struct MemoryRefreshTokenLedger {
    entries: DashMap<String, RefreshTokenRecord>,
    clock: Arc<dyn Clock>,
}

impl MemoryRefreshTokenLedger {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl RefreshTokenLedger for MemoryRefreshTokenLedger {
    async fn store(&self, record: RefreshTokenRecord) -> Result<(), StoreError> {
        self.entries.insert(record.token_hash.clone(), record);
        Ok(())
    }

    async fn consume(&self, token_hash: &str) -> Result<ConsumedToken, StoreError> {
        let (_, record) = self
            .entries
            .remove(token_hash)
            .ok_or(StoreError::NotFound)?;
        if record.expires_at < self.clock.now() {
            return Err(StoreError::Expired);
        }
        Ok(ConsumedToken {
            user_id: record.user_id,
            expires_at: record.expires_at,
        })
    }

    async fn delete(&self, token_hash: &str) -> Result<(), StoreError> {
        self.entries.remove(token_hash);
        Ok(())
    }
}
