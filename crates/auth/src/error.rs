//! Error taxonomy of the auth boundary.
//!
//! Lower layers (hasher, codec, store) have their own error enums. Only the
//! access guard, the login flow and the administration service translate them
//! into [`AuthError`], which is all callers ever see.

use thiserror::Error;

use tessera_core::DomainError;

/// Coarse outcome kinds exposed to callers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Missing/invalid/expired token, unknown credential, inactive principal.
    #[error("unauthenticated")]
    Unauthenticated,

    /// Identity is established but role or tenant does not allow the operation.
    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    /// The addressed tenant (or record) does not exist or is not usable.
    #[error("not found")]
    NotFound,

    /// The principal store could not answer.
    #[error("service unavailable")]
    Unavailable,

    /// Rejected input on a management operation.
    #[error("invalid request: {0}")]
    Invalid(String),

    /// Uniqueness clash on a management operation.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl From<DomainError> for AuthError {
    fn from(err: DomainError) -> Self {
        AuthError::Invalid(err.to_string())
    }
}

/// Failures of the password hasher.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HashError {
    #[error("password must not be empty")]
    EmptyPassword,

    #[error("invalid work factor: {0}")]
    InvalidParams(String),

    #[error("hashing failed: {0}")]
    Hashing(String),
}

/// Failures of token verification (and, rarely, issuance).
///
/// Callers treat every variant as "unauthenticated"; the distinction exists for
/// logs and tests.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Integrity check failed: the token was not produced with our key.
    #[error("bad token signature")]
    BadSignature,

    #[error("token has expired")]
    Expired,

    /// Signed by us, but not structurally a token we can use.
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token encoding failed: {0}")]
    Encoding(String),

    #[error("signing key rejected: {0}")]
    Key(String),
}

/// Failures reported by a principal store implementation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing storage could not be reached or answered with garbage.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A uniqueness constraint (email, live slug) would be violated.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => {
                tracing::warn!(error = %msg, "principal store unavailable");
                AuthError::Unavailable
            }
            StoreError::Conflict(msg) => AuthError::Conflict(msg),
        }
    }
}
