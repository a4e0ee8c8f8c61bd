//! Service wiring: one store, one codec, one hasher, shared by every handler.

use std::sync::Arc;

use thiserror::Error;

use tessera_auth::{
    AccessGuard, Administration, AuthConfig, Authenticator, HashError, PasswordHasher, Store,
    TenantResolver, TokenCodec, TokenError,
};

/// Tenant-scoped routes live under this mount; the segment after it is the
/// tenant slug.
pub const TENANT_MOUNT: &str = "/api/companies";

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("password hasher: {0}")]
    Hasher(#[from] HashError),

    #[error("token codec: {0}")]
    Codec(#[from] TokenError),
}

pub struct AppServices {
    pub guard: AccessGuard<dyn Store>,
    pub auth: Authenticator<dyn Store>,
    pub admin: Administration<dyn Store>,
    pub resolver: Arc<TenantResolver>,
}

impl AppServices {
    pub fn new(store: Arc<dyn Store>, config: &AuthConfig) -> Result<Self, ServiceError> {
        let codec = Arc::new(TokenCodec::new(&config.jwt_secret, config.leeway_secs)?);
        let hasher = Arc::new(PasswordHasher::new(config.argon2)?);

        Ok(Self {
            guard: AccessGuard::new(store.clone(), codec.clone()),
            auth: Authenticator::new(store.clone(), codec, hasher.clone(), config),
            admin: Administration::new(store, hasher, config.min_password_length),
            resolver: Arc::new(TenantResolver::new().mount(TENANT_MOUNT)),
        })
    }
}
