//! Process configuration from environment variables (optionally a `.env` file).

use std::net::SocketAddr;

use secrecy::SecretString;
use thiserror::Error;

use tessera_auth::{Argon2Config, AuthConfig};
use tessera_observability::LogFormat;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Credentials for the platform admin seeded into an empty in-memory store.
#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: SecretString,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub auth: AuthConfig,
    pub bind_addr: SocketAddr,
    pub log_format: LogFormat,
    /// Postgres connection string; the in-memory store is used when absent.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl ApiConfig {
    /// Load from the process environment after reading `.env` if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let secret = get("TESSERA_JWT_SECRET").ok_or(ConfigError::Missing("TESSERA_JWT_SECRET"))?;
        let mut auth = AuthConfig::new(secret);
        let defaults = Argon2Config::default();
        auth.token_ttl_secs = parse_or(&get, "TESSERA_TOKEN_TTL_SECS", auth.token_ttl_secs)?;
        auth.admin_token_ttl_secs =
            parse_or(&get, "TESSERA_ADMIN_TOKEN_TTL_SECS", auth.admin_token_ttl_secs)?;
        auth.leeway_secs = parse_or(&get, "TESSERA_TOKEN_LEEWAY_SECS", auth.leeway_secs)?;
        auth.argon2 = Argon2Config {
            memory_kib: parse_or(&get, "TESSERA_ARGON2_MEMORY_KIB", defaults.memory_kib)?,
            iterations: parse_or(&get, "TESSERA_ARGON2_ITERATIONS", defaults.iterations)?,
            parallelism: parse_or(&get, "TESSERA_ARGON2_PARALLELISM", defaults.parallelism)?,
        };
        auth.min_password_length =
            parse_or(&get, "TESSERA_PASSWORD_MIN_LENGTH", auth.min_password_length)?;

        if auth.token_ttl_secs == 0 || auth.admin_token_ttl_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "TESSERA_TOKEN_TTL_SECS",
                reason: "token lifetimes must be positive".into(),
            });
        }

        let bootstrap_admin = match (
            get("TESSERA_BOOTSTRAP_ADMIN_EMAIL"),
            get("TESSERA_BOOTSTRAP_ADMIN_PASSWORD"),
        ) {
            (Some(email), Some(password)) => Some(BootstrapAdmin {
                email,
                password: SecretString::from(password),
            }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::Invalid {
                    var: "TESSERA_BOOTSTRAP_ADMIN_EMAIL",
                    reason: "email and password must be set together".into(),
                });
            }
        };

        Ok(Self {
            auth,
            bind_addr: parse_or(&get, "TESSERA_BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8080)))?,
            log_format: parse_or(&get, "TESSERA_LOG_FORMAT", LogFormat::default())?,
            database_url: get("DATABASE_URL"),
            database_max_connections: parse_or(&get, "TESSERA_DATABASE_MAX_CONNECTIONS", 10)?,
            bootstrap_admin,
        })
    }
}

fn parse_or<T>(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(var) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
