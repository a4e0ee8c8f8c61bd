//! Authentication configuration.

use secrecy::SecretString;

/// Configuration for hashing, token issuance and verification.
///
/// Everything here is supplied by the process at startup; nothing in the
/// crate falls back to a built-in secret.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HMAC-SHA256 signing secret. At least 32 bytes.
    pub jwt_secret: SecretString,
    /// Lifetime of tokens issued to tenant owners and staff (default: 3600 = 1 hour).
    pub token_ttl_secs: u64,
    /// Lifetime of tokens issued to platform admins (default: 900 = 15 minutes).
    pub admin_token_ttl_secs: u64,
    /// Tolerated clock skew for `iat` checks (default: 0).
    pub leeway_secs: u64,
    /// Argon2id work factor.
    pub argon2: Argon2Config,
    /// Minimum length enforced when new passwords are set.
    pub min_password_length: usize,
}

/// Argon2id cost parameters (see RFC 9106).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argon2Config {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for Argon2Config {
    /// OWASP baseline: m=19 MiB, t=2, p=1.
    fn default() -> Self {
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl AuthConfig {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: SecretString::from(jwt_secret.into()),
            token_ttl_secs: 3600,
            admin_token_ttl_secs: 900,
            leeway_secs: 0,
            argon2: Argon2Config::default(),
            min_password_length: 8,
        }
    }
}
