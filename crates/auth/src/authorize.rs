//! The access guard: the only place authorization decisions are made.
//!
//! - No HTTP
//! - Role and active flag are re-read from the store on every call
//! - Tenant existence is checked against the store, never trusted from the token

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::claims::Claims;
use crate::error::AuthError;
use crate::principal::Principal;
use crate::resolver::TenantCandidate;
use crate::roles::Capability;
use crate::store::PrincipalStore;
use crate::tenant::{Tenant, TenantStatus};
use crate::token::TokenCodec;

/// A successful authorization decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Access {
    pub principal: Principal,
    pub claims: Claims,
    /// Present iff a tenant candidate was supplied.
    pub tenant: Option<Tenant>,
}

pub struct AccessGuard<S: ?Sized> {
    store: Arc<S>,
    codec: Arc<TokenCodec>,
}

impl<S: ?Sized> Clone for AccessGuard<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            codec: self.codec.clone(),
        }
    }
}

impl<S: ?Sized> core::fmt::Debug for AccessGuard<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AccessGuard")
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}

impl<S> AccessGuard<S>
where
    S: PrincipalStore + ?Sized,
{
    pub fn new(store: Arc<S>, codec: Arc<TokenCodec>) -> Self {
        Self { store, codec }
    }

    pub async fn authorize(
        &self,
        token: &str,
        required: Capability,
        candidate: Option<&TenantCandidate>,
    ) -> Result<Access, AuthError> {
        self.authorize_at(token, required, candidate, Utc::now()).await
    }

    pub async fn authorize_at(
        &self,
        token: &str,
        required: Capability,
        candidate: Option<&TenantCandidate>,
        now: DateTime<Utc>,
    ) -> Result<Access, AuthError> {
        let claims = self.codec.verify_at(token, now).map_err(|e| {
            tracing::debug!(error = %e, "token rejected");
            AuthError::Unauthenticated
        })?;

        let principal = match self.store.find_by_id(claims.sub).await? {
            Some(p) if p.active && p.is_well_formed() => p,
            Some(_) => {
                tracing::debug!(principal_id = %claims.sub, "principal inactive");
                return Err(AuthError::Unauthenticated);
            }
            None => {
                tracing::debug!(principal_id = %claims.sub, "principal not found");
                return Err(AuthError::Unauthenticated);
            }
        };

        if !required.permits(principal.role) {
            return Err(AuthError::Forbidden("insufficient role"));
        }

        let tenant = match candidate {
            Some(candidate) => Some(self.admit_to_tenant(&principal, candidate).await?),
            None => None,
        };

        Ok(Access {
            principal,
            claims,
            tenant,
        })
    }

    async fn admit_to_tenant(
        &self,
        principal: &Principal,
        candidate: &TenantCandidate,
    ) -> Result<Tenant, AuthError> {
        let tenant = self
            .store
            .find_tenant_by_slug(candidate.as_str())
            .await?
            .filter(|t| !t.is_archived())
            .ok_or(AuthError::NotFound)?;

        if principal.role.is_platform() {
            return Ok(tenant);
        }

        if tenant.status == TenantStatus::Suspended {
            return Err(AuthError::NotFound);
        }

        match principal.tenant_id {
            Some(own) if own == tenant.id => Ok(tenant),
            _ => {
                tracing::info!(
                    principal_id = %principal.id,
                    tenant = %candidate,
                    "cross-tenant access denied"
                );
                Err(AuthError::Forbidden("tenant mismatch"))
            }
        }
    }
}
