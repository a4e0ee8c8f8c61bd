//! Credential login: email + password in, signed token out.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use tessera_core::Email;

use crate::claims::TokenSubject;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::password::{PasswordHasher, verify_blocking};
use crate::principal::{Principal, PrincipalSummary};
use crate::store::PrincipalStore;
use crate::tenant::Tenant;
use crate::token::TokenCodec;

pub const TOKEN_TYPE: &str = "bearer";

/// Result of a successful login.
#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
    pub principal: PrincipalSummary,
}

/// Verifies credentials and issues tokens.
///
/// Every failure is reported as [`AuthError::Unauthenticated`] except store
/// outages, so callers cannot learn which check rejected the attempt.
pub struct Authenticator<S: ?Sized> {
    store: Arc<S>,
    codec: Arc<TokenCodec>,
    hasher: Arc<PasswordHasher>,
    token_ttl: Duration,
    admin_token_ttl: Duration,
}

impl<S: ?Sized> Clone for Authenticator<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            codec: self.codec.clone(),
            hasher: self.hasher.clone(),
            token_ttl: self.token_ttl,
            admin_token_ttl: self.admin_token_ttl,
        }
    }
}

impl<S> Authenticator<S>
where
    S: PrincipalStore + ?Sized,
{
    pub fn new(
        store: Arc<S>,
        codec: Arc<TokenCodec>,
        hasher: Arc<PasswordHasher>,
        config: &AuthConfig,
    ) -> Self {
        Self {
            store,
            codec,
            hasher,
            token_ttl: ttl(config.token_ttl_secs),
            admin_token_ttl: ttl(config.admin_token_ttl_secs),
        }
    }

    #[tracing::instrument(name = "auth.login", skip_all)]
    pub async fn login(&self, identifier: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let principal = match Email::parse(identifier) {
            Ok(email) => self.store.find_by_email(&email).await?,
            Err(_) => None,
        };

        let Some(mut principal) = principal else {
            verify_blocking(self.hasher.clone(), password.to_string(), None).await;
            tracing::info!("login rejected: unknown identifier");
            return Err(AuthError::Unauthenticated);
        };

        let matched = verify_blocking(
            self.hasher.clone(),
            password.to_string(),
            Some(principal.password_digest.clone()),
        )
        .await;
        if !matched {
            tracing::info!(principal_id = %principal.id, "login rejected: bad credential");
            return Err(AuthError::Unauthenticated);
        }
        if !principal.active || !principal.is_well_formed() {
            tracing::info!(principal_id = %principal.id, "login rejected: principal inactive");
            return Err(AuthError::Unauthenticated);
        }

        let tenant = self.login_tenant(&principal).await?;

        let now = Utc::now();
        let ttl = if principal.role.is_platform() {
            self.admin_token_ttl
        } else {
            self.token_ttl
        };
        let subject = TokenSubject {
            principal_id: principal.id,
            role: principal.role,
            tenant_id: principal.tenant_id,
            tenant_slug: tenant.as_ref().map(|t| t.slug.as_str().to_string()),
        };
        let issued = self.codec.issue_at(subject, ttl, now).map_err(|e| {
            tracing::error!(error = %e, "token issuance failed");
            AuthError::Unavailable
        })?;

        match self.store.touch_last_authenticated(principal.id, now).await {
            Ok(()) => principal.last_authenticated_at = Some(now),
            Err(e) => {
                tracing::warn!(principal_id = %principal.id, error = %e, "could not record login time")
            }
        }

        tracing::info!(principal_id = %principal.id, role = %principal.role, "login succeeded");
        Ok(LoginOutcome {
            token: issued.token,
            token_type: TOKEN_TYPE,
            expires_at: issued.claims.expires_at,
            principal: principal.summary(tenant.as_ref()),
        })
    }

    /// Tenant-bound principals may only log in while their tenant exists and
    /// is not archived.
    async fn login_tenant(&self, principal: &Principal) -> Result<Option<Tenant>, AuthError> {
        let Some(tenant_id) = principal.tenant_id else {
            return Ok(None);
        };
        match self.store.find_tenant_by_id(tenant_id).await? {
            Some(tenant) if !tenant.is_archived() => Ok(Some(tenant)),
            _ => {
                tracing::info!(principal_id = %principal.id, "login rejected: tenant unavailable");
                Err(AuthError::Unauthenticated)
            }
        }
    }
}

/// Lifetimes are capped at a year.
const MAX_TTL_SECS: u64 = 365 * 86_400;

fn ttl(secs: u64) -> Duration {
    Duration::seconds(secs.min(MAX_TTL_SECS) as i64)
}
