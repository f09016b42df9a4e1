use std::sync::Arc;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, error};
use uuid::Uuid;

use crate::domain::token::{RefreshTokenRecord, TokenPair};
use crate::domain::user::{User, UserSummary};
use crate::infra::clock::Clock;
use crate::security::jwt::{TokenCodec, TokenError};
use crate::security::password::{PasswordError, PasswordHasher};
use crate::store::{RefreshTokenLedger, StoreError, UserStore};

use super::error::AuthError;

/// Register/login response body: the fresh pair plus the public user.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub user: UserSummary,
}

/// Orchestrates credentials and sessions over injected collaborators.
/// Holds no mutable state of its own; everything durable lives in the
/// stores, so clones share nothing but handles.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    ledger: Arc<dyn RefreshTokenLedger>,
    hasher: Arc<dyn PasswordHasher>,
    codec: Arc<TokenCodec>,
    clock: Arc<dyn Clock>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        ledger: Arc<dyn RefreshTokenLedger>,
        hasher: Arc<dyn PasswordHasher>,
        codec: Arc<TokenCodec>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            ledger,
            hasher,
            codec,
            clock,
        }
    }

    /// Creates the account and signs it in. If persisting the refresh token
    /// fails after the user row exists, the account is still durable and a
    /// later login recovers; no transaction spans the two stores.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        if name.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::Validation(
                "name, email and password are required".into(),
            ));
        }
        if self.find_user(email).await?.is_some() {
            return Err(AuthError::Conflict);
        }

        let password_hash = self.hasher.hash(password).await.map_err(hasher_failed)?;
        let now = self.clock.now();
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            email: email.to_owned(),
            password_hash,
            created_at: now,
            updated_at: now,
        };
        match self.users.insert(&user).await {
            Ok(()) => {}
            // lost the race against a concurrent registration
            Err(StoreError::Duplicate) => return Err(AuthError::Conflict),
            Err(err) => return Err(store_failed(err)),
        }

        let tokens = self.issue_session(user.id).await?;
        Ok(AuthSession {
            tokens,
            user: UserSummary::from(&user),
        })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::Validation("email and password are required".into()));
        }
        let user = self
            .find_user(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        let valid = self
            .hasher
            .verify(password, &user.password_hash)
            .await
            .map_err(hasher_failed)?;
        if !valid {
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = self.issue_session(user.id).await?;
        Ok(AuthSession {
            tokens,
            user: UserSummary::from(&user),
        })
    }

    /// Rotation. The presented token must carry a live refresh signature
    /// *and* still sit in the ledger: a well-signed token may already be
    /// spent, and the ledger is the authoritative source of liveness. The
    /// consume is atomic, so concurrent replays get exactly one winner; the
    /// returned pair is always freshly minted.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        if refresh_token.is_empty() {
            return Err(AuthError::Validation("refreshToken is required".into()));
        }
        self.codec
            .verify_refresh(refresh_token)
            .map_err(invalid_token)?;

        let consumed = match self.ledger.consume(&hash_token(refresh_token)).await {
            Ok(consumed) => consumed,
            Err(err @ (StoreError::NotFound | StoreError::Expired)) => {
                debug!(kind = %err, "refresh token rejected by ledger");
                return Err(AuthError::InvalidToken);
            }
            Err(err) => return Err(store_failed(err)),
        };

        self.issue_session(consumed.user_id).await
    }

    /// Revokes only the presented token; other live refresh tokens for the
    /// same user stay valid and access tokens run out their own expiry.
    /// Deleting an absent token is not an error.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        self.ledger
            .delete(&hash_token(refresh_token))
            .await
            .map_err(store_failed)
    }

    /// The single verification entry point for protected routes.
    pub fn verify_access(&self, token: &str) -> Result<Uuid, AuthError> {
        self.codec.verify_access(token).map_err(invalid_token)
    }

    async fn find_user(&self, email: &str) -> Result<Option<User>, AuthError> {
        self.users.find_by_email(email).await.map_err(store_failed)
    }

    /// Mint an access+refresh pair and record the refresh digest.
    async fn issue_session(&self, user_id: Uuid) -> Result<TokenPair, AuthError> {
        let access_token = self.codec.issue_access(user_id).map_err(signing_failed)?;
        let refresh_token = self.codec.issue_refresh(user_id).map_err(signing_failed)?;
        let now = self.clock.now();
        self.ledger
            .store(RefreshTokenRecord {
                token_hash: hash_token(&refresh_token),
                user_id,
                expires_at: now + self.codec.refresh_ttl(),
                created_at: now,
            })
            .await
            .map_err(store_failed)?;
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }
}

pub fn hash_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

fn store_failed(err: StoreError) -> AuthError {
    error!(error = %err, "store failure during auth operation");
    AuthError::Unavailable
}

fn hasher_failed(err: PasswordError) -> AuthError {
    error!(error = %err, "password hashing failure");
    AuthError::Unavailable
}

fn signing_failed(err: TokenError) -> AuthError {
    error!(error = %err, "token signing failure");
    AuthError::Unavailable
}

fn invalid_token(err: TokenError) -> AuthError {
    debug!(kind = ?err, "token verification failed");
    AuthError::InvalidToken
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use time::{Duration, OffsetDateTime};

    use super::*;
    use crate::infra::clock::ManualClock;
    use crate::security::config::AuthConfig;
    use crate::security::password::PlainTextHasher;
    use crate::store::memory::{MemoryRefreshTokenLedger, MemoryUserStore};

    fn test_config() -> AuthConfig {
        AuthConfig {
            access_secret: "access-test-secret".into(),
            refresh_secret: "refresh-test-secret".into(),
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(7),
        }
    }

    struct Harness {
        service: AuthService,
        users: Arc<MemoryUserStore>,
        clock: ManualClock,
    }

    fn harness() -> Harness {
        let clock = ManualClock::new(OffsetDateTime::now_utc());
        let shared_clock: Arc<dyn Clock> = Arc::new(clock.clone());
        let users = Arc::new(MemoryUserStore::new());
        let ledger = Arc::new(MemoryRefreshTokenLedger::new(shared_clock.clone()));
        let codec = Arc::new(TokenCodec::new(&test_config(), shared_clock.clone()));
        let service = AuthService::new(
            users.clone(),
            ledger,
            Arc::new(PlainTextHasher),
            codec,
            shared_clock,
        );
        Harness {
            service,
            users,
            clock,
        }
    }

    #[tokio::test]
    async fn register_then_login_maps_to_the_same_user() {
        let h = harness();
        let registered = h
            .service
            .register("Alice", "alice@example.com", "Password123!")
            .await
            .unwrap();
        let logged_in = h
            .service
            .login("alice@example.com", "Password123!")
            .await
            .unwrap();
        assert_eq!(registered.user.id, logged_in.user.id);
        assert_eq!(registered.user.name, "Alice");
        assert_eq!(
            h.service
                .verify_access(&logged_in.tokens.access_token)
                .unwrap(),
            registered.user.id
        );
    }

    #[tokio::test]
    async fn duplicate_email_registration_is_a_conflict() {
        let h = harness();
        h.service
            .register("Alice", "alice@example.com", "pw-one")
            .await
            .unwrap();
        let err = h
            .service
            .register("Alice Again", "alice@example.com", "pw-two")
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::Conflict);
        assert_eq!(h.users.len(), 1);
    }

    #[tokio::test]
    async fn missing_fields_fail_validation() {
        let h = harness();
        assert!(matches!(
            h.service.register("", "a@example.com", "pw").await,
            Err(AuthError::Validation(_))
        ));
        assert!(matches!(
            h.service.login("a@example.com", "").await,
            Err(AuthError::Validation(_))
        ));
        assert!(matches!(
            h.service.refresh("").await,
            Err(AuthError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_identical() {
        let h = harness();
        h.service
            .register("Alice", "alice@example.com", "right-pw")
            .await
            .unwrap();
        let wrong_pw = h
            .service
            .login("alice@example.com", "wrong-pw")
            .await
            .unwrap_err();
        let unknown = h
            .service
            .login("nobody@example.com", "right-pw")
            .await
            .unwrap_err();
        assert_eq!(wrong_pw, AuthError::InvalidCredentials);
        assert_eq!(wrong_pw, unknown);
    }

    #[tokio::test]
    async fn email_matching_is_case_sensitive() {
        let h = harness();
        h.service
            .register("Alice", "Alice@example.com", "pw")
            .await
            .unwrap();
        assert!(h.service.login("Alice@example.com", "pw").await.is_ok());
        assert_eq!(
            h.service
                .login("alice@example.com", "pw")
                .await
                .unwrap_err(),
            AuthError::InvalidCredentials
        );
    }

    #[tokio::test]
    async fn refresh_rotates_and_burns_the_presented_token() {
        let h = harness();
        let session = h
            .service
            .register("Alice", "alice@example.com", "pw")
            .await
            .unwrap();

        let rotated = h
            .service
            .refresh(&session.tokens.refresh_token)
            .await
            .unwrap();
        assert_ne!(rotated.refresh_token, session.tokens.refresh_token);

        // replay of the consumed token fails, the rotated one is live
        assert_eq!(
            h.service
                .refresh(&session.tokens.refresh_token)
                .await
                .unwrap_err(),
            AuthError::InvalidToken
        );
        h.service.refresh(&rotated.refresh_token).await.unwrap();
    }

    #[tokio::test]
    async fn tokens_from_separate_logins_rotate_independently() {
        let h = harness();
        h.service
            .register("Alice", "alice@example.com", "pw")
            .await
            .unwrap();
        let one = h.service.login("alice@example.com", "pw").await.unwrap();
        let two = h.service.login("alice@example.com", "pw").await.unwrap();

        h.service.refresh(&one.tokens.refresh_token).await.unwrap();
        h.service.refresh(&two.tokens.refresh_token).await.unwrap();
    }

    #[tokio::test]
    async fn logout_revokes_only_the_presented_token() {
        let h = harness();
        let first = h
            .service
            .register("Alice", "alice@example.com", "pw")
            .await
            .unwrap();
        let second = h.service.login("alice@example.com", "pw").await.unwrap();

        h.service
            .logout(&first.tokens.refresh_token)
            .await
            .unwrap();
        assert_eq!(
            h.service
                .refresh(&first.tokens.refresh_token)
                .await
                .unwrap_err(),
            AuthError::InvalidToken
        );
        // logging out twice is fine, and the other session is untouched
        h.service
            .logout(&first.tokens.refresh_token)
            .await
            .unwrap();
        h.service
            .refresh(&second.tokens.refresh_token)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn well_signed_but_unstored_token_cannot_refresh() {
        let h = harness();
        let stray_codec = TokenCodec::new(&test_config(), Arc::new(h.clock.clone()));
        let stray = stray_codec.issue_refresh(Uuid::new_v4()).unwrap();
        assert_eq!(
            h.service.refresh(&stray).await.unwrap_err(),
            AuthError::InvalidToken
        );
    }

    #[tokio::test]
    async fn garbage_token_cannot_refresh() {
        let h = harness();
        assert_eq!(
            h.service.refresh("not-a-token").await.unwrap_err(),
            AuthError::InvalidToken
        );
    }

    #[tokio::test]
    async fn expired_refresh_token_is_rejected() {
        // past the 7-day window both the claim check and the ledger agree
        let h = harness();
        let session = h
            .service
            .register("Alice", "alice@example.com", "pw")
            .await
            .unwrap();
        h.clock.advance(Duration::days(8));
        assert_eq!(
            h.service
                .refresh(&session.tokens.refresh_token)
                .await
                .unwrap_err(),
            AuthError::InvalidToken
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_refreshes_have_exactly_one_winner() {
        let h = harness();
        let session = h
            .service
            .register("Alice", "alice@example.com", "pw")
            .await
            .unwrap();
        let token = session.tokens.refresh_token;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = h.service.clone();
            let token = token.clone();
            handles.push(tokio::spawn(async move { service.refresh(&token).await }));
        }

        let mut winners = 0;
        let mut losers = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => winners += 1,
                Err(AuthError::InvalidToken) => losers += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(losers, 7);
    }

    struct FlakyLedger {
        inner: MemoryRefreshTokenLedger,
        fail: AtomicBool,
    }

    #[async_trait]
    impl RefreshTokenLedger for FlakyLedger {
        async fn store(&self, record: RefreshTokenRecord) -> Result<(), StoreError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("injected".into()));
            }
            self.inner.store(record).await
        }

        async fn consume(&self, token_hash: &str) -> Result<ConsumedToken, StoreError> {
            self.inner.consume(token_hash).await
        }

        async fn delete(&self, token_hash: &str) -> Result<(), StoreError> {
            self.inner.delete(token_hash).await
        }
    }

    use crate::domain::token::ConsumedToken;

    #[tokio::test]
    async fn registration_survives_a_failed_token_store() {
        let clock = ManualClock::new(OffsetDateTime::now_utc());
        let shared_clock: Arc<dyn Clock> = Arc::new(clock);
        let ledger = Arc::new(FlakyLedger {
            inner: MemoryRefreshTokenLedger::new(shared_clock.clone()),
            fail: AtomicBool::new(true),
        });
        let codec = Arc::new(TokenCodec::new(&test_config(), shared_clock.clone()));
        let service = AuthService::new(
            Arc::new(MemoryUserStore::new()),
            ledger.clone(),
            Arc::new(PlainTextHasher),
            codec,
            shared_clock,
        );

        let err = service
            .register("Alice", "alice@example.com", "pw")
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::Unavailable);

        // the user row is durable; once the ledger recovers, login succeeds
        ledger.fail.store(false, Ordering::SeqCst);
        service.login("alice@example.com", "pw").await.unwrap();
    }
}
