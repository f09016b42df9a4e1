use thiserror::Error;

/// The complete set of failures auth operations can produce. Collaborator
/// internals (store, hasher, codec) never escape past this boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// A required input is missing or malformed; the message names it.
    #[error("{0}")]
    Validation(String),
    /// The email address is already registered.
    #[error("email already registered")]
    Conflict,
    /// Unknown email or wrong password; deliberately indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,
    /// Expired, malformed, tampered, already-consumed or revoked token.
    #[error("invalid or expired token")]
    InvalidToken,
    /// A collaborator failed; nothing was retried.
    #[error("service unavailable")]
    Unavailable,
}
