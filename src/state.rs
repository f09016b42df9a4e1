use std::sync::Arc;

use crate::auth::AuthService;
use crate::infra::db::Db;

/// Shared handles for the handler layer: the pool for CRUD queries and the
/// auth service for everything session-related.
pub struct AppState {
    pub db: Db,
    pub auth: AuthService,
}

impl AppState {
    pub fn new(db: Db, auth: AuthService) -> Arc<Self> {
        Arc::new(Self { db, auth })
    }
}
