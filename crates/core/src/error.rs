//! Errors raised while building tessera's core values.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Rejection of a value or state before it reaches a store.
///
/// The auth layer reports every variant to callers as invalid input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed email, slug, role name or similar input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A principal's role and tenant binding disagree.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// A tenant or principal id that is not a UUID.
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
