use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString};
use argon2::{Argon2, Params, Version};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("hash error: {0}")]
    Hash(String),
    #[error("hashing task failed")]
    Task,
}

/// Credential hashing seam. The argon2 implementation is deliberately slow
/// and runs on the blocking pool; unit tests swap in a cheap stand-in.
#[async_trait]
pub trait PasswordHasher: Send + Sync {
    async fn hash(&self, plain: &str) -> Result<String, PasswordError>;
    async fn verify(&self, plain: &str, hash: &str) -> Result<bool, PasswordError>;
}

#[derive(Clone)]
pub struct Argon2PasswordHasher {
    inner: Argon2<'static>,
}

impl Argon2PasswordHasher {
    /// argon2id with 64 MiB memory, 3 passes, 4 lanes.
    pub fn new() -> Self {
        Self::with_params(64 * 1024, 3, 4)
    }

    /// Tunable costs; tests use small values to keep runs fast. Panics on
    /// out-of-range costs.
    pub fn with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> Self {
        let params =
            Params::new(m_cost, t_cost, p_cost, None).expect("invalid argon2 cost parameters");
        Self {
            inner: Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params),
        }
    }
}

impl Default for Argon2PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PasswordHasher for Argon2PasswordHasher {
    async fn hash(&self, plain: &str) -> Result<String, PasswordError> {
        let argon = self.inner.clone();
        let plain = plain.to_owned();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            argon
                .hash_password(plain.as_bytes(), &salt)
                .map(|p| p.to_string())
                .map_err(|e| PasswordError::Hash(e.to_string()))
        })
        .await
        .map_err(|_| PasswordError::Task)?
    }

    async fn verify(&self, plain: &str, hash: &str) -> Result<bool, PasswordError> {
        let argon = self.inner.clone();
        let plain = plain.to_owned();
        let hash = hash.to_owned();
        tokio::task::spawn_blocking(move || {
            let parsed =
                PasswordHash::new(&hash).map_err(|e| PasswordError::Hash(e.to_string()))?;
            Ok(argon.verify_password(plain.as_bytes(), &parsed).is_ok())
        })
        .await
        .map_err(|_| PasswordError::Task)?
    }
}

/// Plaintext stand-in for unit tests that don't exercise hashing itself.
#[cfg(test)]
pub struct PlainTextHasher;

#[cfg(test)]
#[async_trait]
impl PasswordHasher for PlainTextHasher {
    async fn hash(&self, plain: &str) -> Result<String, PasswordError> {
        Ok(format!("plain:{plain}"))
    }

    async fn verify(&self, plain: &str, hash: &str) -> Result<bool, PasswordError> {
        Ok(hash == format!("plain:{plain}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> Argon2PasswordHasher {
        Argon2PasswordHasher::with_params(1024, 1, 1)
    }

    #[tokio::test]
    async fn hash_then_verify_round_trip() {
        let h = hasher();
        let digest = h.hash("s3cret-pass").await.unwrap();
        assert!(digest.starts_with("$argon2id$"));
        assert!(h.verify("s3cret-pass", &digest).await.unwrap());
    }

    #[tokio::test]
    async fn wrong_password_does_not_verify() {
        let h = hasher();
        let digest = h.hash("s3cret-pass").await.unwrap();
        assert!(!h.verify("other-pass", &digest).await.unwrap());
    }

    #[test]
    #[should_panic(expected = "argon2 cost")]
    fn out_of_range_costs_fail_at_construction() {
        let _ = Argon2PasswordHasher::with_params(1024, 0, 1);
    }

    #[tokio::test]
    async fn garbage_stored_hash_is_an_error() {
        let h = hasher();
        assert!(h.verify("whatever", "not-a-phc-string").await.is_err());
    }
}
