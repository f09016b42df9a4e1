use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

/// Ledger entry backing one live refresh token. Only the SHA-256 digest of
/// the token value is kept at rest; the plaintext exists client-side only.
#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    pub token_hash: String,
    pub user_id: Uuid,
    pub expires_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
}

/// What an atomic consume hands back to the rotation step.
#[derive(Debug, Clone, Copy)]
pub struct ConsumedToken {
    pub user_id: Uuid,
    pub expires_at: OffsetDateTime,
}

/// Freshly minted access + refresh pair.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}
