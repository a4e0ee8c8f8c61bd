//! Password hashing and verification using Argon2id.

use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher as _, PasswordVerifier, Version,
    password_hash::{SaltString, rand_core::OsRng},
};

use std::sync::Arc;

use crate::config::Argon2Config;
use crate::error::HashError;

/// Input hashed once at construction; the resulting digest absorbs the work
/// for lookups that have no real digest to compare against.
const DUMMY_INPUT: &[u8] = b"tessera-dummy-credential";

/// One-way credential hashing with a fixed, adjustable work factor.
///
/// Digests are PHC strings (`$argon2id$v=19$m=..,t=..,p=..$salt$hash`), so
/// verification always uses the salt and cost recorded in the digest itself,
/// even after the configured work factor changes.
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
    dummy_digest: String,
}

impl core::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("params", self.argon2.params())
            .finish_non_exhaustive()
    }
}

impl PasswordHasher {
    pub fn new(config: Argon2Config) -> Result<Self, HashError> {
        let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)
            .map_err(|e| HashError::InvalidParams(e.to_string()))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let salt = SaltString::generate(&mut OsRng);
        let dummy_digest = argon2
            .hash_password(DUMMY_INPUT, &salt)
            .map_err(|e| HashError::Hashing(e.to_string()))?
            .to_string();

        Ok(Self {
            argon2,
            dummy_digest,
        })
    }

    /// Hash a password with a fresh random salt.
    pub fn hash(&self, password: &str) -> Result<String, HashError> {
        if password.is_empty() {
            return Err(HashError::EmptyPassword);
        }
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| HashError::Hashing(e.to_string()))
    }

    /// Verify a password against a stored digest.
    ///
    /// Fails closed: empty passwords and malformed digests yield `false`. A
    /// malformed digest still costs one full hash so it cannot be told apart
    /// by timing.
    pub fn verify(&self, password: &str, digest: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(digest) else {
            self.verify_dummy(password);
            return false;
        };
        let matched = self
            .argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok();
        matched && !password.is_empty()
    }

    /// Spend the same work as a real verification and report failure.
    pub fn verify_dummy(&self, password: &str) -> bool {
        if let Ok(parsed) = PasswordHash::new(&self.dummy_digest) {
            let _ = self.argon2.verify_password(password.as_bytes(), &parsed);
        }
        false
    }
}

/// Hash on the blocking pool; Argon2 would otherwise stall a runtime worker.
pub async fn hash_blocking(hasher: Arc<PasswordHasher>, password: String) -> Result<String, HashError> {
    tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await
        .map_err(|e| HashError::Hashing(e.to_string()))?
}

/// Verify on the blocking pool. A digest of `None` runs the dummy check.
pub async fn verify_blocking(
    hasher: Arc<PasswordHasher>,
    password: String,
    digest: Option<String>,
) -> bool {
    let outcome = tokio::task::spawn_blocking(move || match digest {
        Some(digest) => hasher.verify(&password, &digest),
        None => hasher.verify_dummy(&password),
    })
    .await;
    match outcome {
        Ok(matched) => matched,
        Err(e) => {
            tracing::error!(error = %e, "password verification task failed");
            false
        }
    }
}

/// Minimum strength policy for newly set passwords.
///
/// At least `min_length` characters, one ASCII letter and one digit.
pub fn validate_password_strength(password: &str, min_length: usize) -> Result<(), String> {
    if password.chars().count() < min_length {
        return Err(format!("password must be at least {min_length} characters"));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("password must contain at least one digit".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_alphabetic()) {
        return Err("password must contain at least one letter".to_string());
    }
    Ok(())
}
