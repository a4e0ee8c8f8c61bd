//! Tenant and user administration.
//!
//! Callers must already hold an [`Access`](crate::Access) for the required
//! capability; this service applies the user-management rules on top and
//! talks to the [`Store`].

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use tessera_core::{PrincipalId, TenantId, TenantSlug};

use crate::Role;
use crate::error::AuthError;
use crate::password::{PasswordHasher, hash_blocking};
use crate::principal::{Principal, PrincipalSummary, ensure_role_binding};
use crate::store::{PrincipalFilter, Store};
use crate::tenant::{Tenant, TenantStatus};
use crate::user::{
    NewPrincipal, ensure_assignable, ensure_can_deactivate_in_tenant, ensure_can_grant_in_tenant,
    ensure_not_self,
};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewTenant {
    pub slug: String,
    pub name: String,
}

/// A principal to be created inside the addressed tenant.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewMember {
    pub email: String,
    pub display_name: String,
    pub password: String,
    #[serde(default = "default_member_role")]
    pub role: Role,
}

fn default_member_role() -> Role {
    Role::TenantStaff
}

/// Largest page a listing returns.
pub const MAX_PAGE_LIMIT: usize = 100;

/// Offset pagination for administrative listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    skip: usize,
    limit: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: MAX_PAGE_LIMIT,
        }
    }
}

impl Page {
    /// `limit` must be in `1..=MAX_PAGE_LIMIT`; omitted values take the defaults.
    pub fn new(skip: Option<usize>, limit: Option<usize>) -> Result<Self, AuthError> {
        let limit = limit.unwrap_or(MAX_PAGE_LIMIT);
        if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
            return Err(AuthError::Invalid(format!(
                "limit must be between 1 and {MAX_PAGE_LIMIT}"
            )));
        }
        Ok(Self {
            skip: skip.unwrap_or(0),
            limit,
        })
    }

    fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        items.into_iter().skip(self.skip).take(self.limit).collect()
    }
}

/// A tenant together with the number of principals bound to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantDetail {
    #[serde(flatten)]
    pub tenant: Tenant,
    pub user_count: usize,
}

/// Platform-wide counters for the admin dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DirectoryStats {
    pub total_tenants: usize,
    pub active_tenants: usize,
    pub total_users: usize,
    pub active_users: usize,
}

pub struct Administration<S: ?Sized> {
    store: Arc<S>,
    hasher: Arc<PasswordHasher>,
    min_password_length: usize,
}

impl<S: ?Sized> Clone for Administration<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            hasher: self.hasher.clone(),
            min_password_length: self.min_password_length,
        }
    }
}

impl<S> Administration<S>
where
    S: Store + ?Sized,
{
    pub fn new(store: Arc<S>, hasher: Arc<PasswordHasher>, min_password_length: usize) -> Self {
        Self {
            store,
            hasher,
            min_password_length,
        }
    }

    // ── platform: tenants ────────────────────────────────────────────────

    pub async fn create_tenant(&self, input: NewTenant) -> Result<Tenant, AuthError> {
        let slug = TenantSlug::parse(input.slug.trim())?;
        let tenant = Tenant::new(slug, input.name)?;
        let tenant = self.store.insert_tenant(tenant).await?;
        tracing::info!(tenant_id = %tenant.id, slug = %tenant.slug, "tenant created");
        Ok(tenant)
    }

    pub async fn list_tenants(&self, page: Page) -> Result<Vec<Tenant>, AuthError> {
        Ok(page.apply(self.store.list_tenants().await?))
    }

    /// One tenant, archived ones included, with its member count.
    pub async fn get_tenant(&self, id: TenantId) -> Result<TenantDetail, AuthError> {
        let tenant = self
            .store
            .find_tenant_by_id(id)
            .await?
            .ok_or(AuthError::NotFound)?;
        self.detail(tenant).await
    }

    pub async fn rename_tenant(&self, id: TenantId, name: String) -> Result<TenantDetail, AuthError> {
        let name = Tenant::normalize_name(name)?;
        let tenant = self
            .store
            .rename_tenant(id, name)
            .await?
            .ok_or(AuthError::NotFound)?;
        tracing::info!(tenant_id = %id, "tenant renamed");
        self.detail(tenant).await
    }

    /// Archive a tenant. Tenants are never hard-deleted.
    pub async fn archive_tenant(&self, id: TenantId) -> Result<Tenant, AuthError> {
        self.set_tenant_status(id, TenantStatus::Archived).await
    }

    pub async fn stats(&self) -> Result<DirectoryStats, AuthError> {
        let tenants = self.store.list_tenants().await?;
        let principals = self.store.list_principals(PrincipalFilter::default()).await?;
        Ok(DirectoryStats {
            total_tenants: tenants.len(),
            active_tenants: tenants.iter().filter(|t| t.is_active()).count(),
            total_users: principals.len(),
            active_users: principals.iter().filter(|p| p.active).count(),
        })
    }

    pub async fn set_tenant_status(
        &self,
        id: TenantId,
        status: TenantStatus,
    ) -> Result<Tenant, AuthError> {
        let tenant = self
            .store
            .set_tenant_status(id, status)
            .await?
            .ok_or(AuthError::NotFound)?;
        tracing::info!(tenant_id = %id, status = %status, "tenant status changed");
        Ok(tenant)
    }

    // ── platform: principals ─────────────────────────────────────────────

    pub async fn list_principals(
        &self,
        filter: PrincipalFilter,
        page: Page,
    ) -> Result<Vec<PrincipalSummary>, AuthError> {
        let principals = page.apply(self.store.list_principals(filter).await?);
        let tenants: HashMap<TenantId, Tenant> = self
            .store
            .list_tenants()
            .await?
            .into_iter()
            .map(|t| (t.id, t))
            .collect();
        Ok(principals
            .iter()
            .map(|p| p.summary(p.tenant_id.and_then(|id| tenants.get(&id))))
            .collect())
    }

    pub async fn create_principal(&self, input: NewPrincipal) -> Result<PrincipalSummary, AuthError> {
        let input = input.validate(self.min_password_length)?;
        let tenant = match input.tenant_id {
            Some(id) => {
                let tenant = self.store.find_tenant_by_id(id).await?;
                ensure_assignable(tenant.as_ref())?;
                tenant
            }
            None => None,
        };

        let digest = hash_blocking(self.hasher.clone(), input.password).await.map_err(|e| {
            tracing::error!(error = %e, "password hashing failed");
            AuthError::Unavailable
        })?;
        let principal = Principal::new(
            input.email,
            input.display_name,
            digest,
            input.role,
            input.tenant_id,
        )?;
        let principal = self.store.insert_principal(principal).await?;
        tracing::info!(principal_id = %principal.id, role = %principal.role, "principal created");
        Ok(principal.summary(tenant.as_ref()))
    }

    pub async fn set_active(
        &self,
        actor: &Principal,
        id: PrincipalId,
        active: bool,
    ) -> Result<PrincipalSummary, AuthError> {
        let target = self.load(id).await?;
        ensure_not_self(actor, &target)?;
        let updated = self
            .store
            .set_active(id, active)
            .await?
            .ok_or(AuthError::NotFound)?;
        tracing::info!(principal_id = %id, active, "principal activation changed");
        self.summarize(updated).await
    }

    /// Change a principal's role. Moving into a tenant role needs a tenant:
    /// `tenant_id` if given, else the one already bound. Promoting to
    /// platform admin drops the tenant binding.
    pub async fn set_role(
        &self,
        actor: &Principal,
        id: PrincipalId,
        role: Role,
        tenant_id: Option<TenantId>,
    ) -> Result<PrincipalSummary, AuthError> {
        let target = self.load(id).await?;
        ensure_not_self(actor, &target)?;

        let tenant_id = if role.is_platform() {
            None
        } else {
            tenant_id.or(target.tenant_id)
        };
        ensure_role_binding(role, tenant_id)?;
        if let Some(tid) = tenant_id {
            ensure_assignable(self.store.find_tenant_by_id(tid).await?.as_ref())?;
        }

        let updated = self
            .store
            .set_role(id, role, tenant_id)
            .await?
            .ok_or(AuthError::NotFound)?;
        tracing::info!(principal_id = %id, role = %role, "principal role changed");
        self.summarize(updated).await
    }

    // ── tenant-scoped ────────────────────────────────────────────────────

    pub async fn tenant_members(&self, tenant: &Tenant) -> Result<Vec<PrincipalSummary>, AuthError> {
        let principals = self
            .store
            .list_principals(PrincipalFilter::tenant(tenant.id))
            .await?;
        Ok(principals.iter().map(|p| p.summary(Some(tenant))).collect())
    }

    pub async fn create_member(
        &self,
        actor: &Principal,
        tenant: &Tenant,
        input: NewMember,
    ) -> Result<PrincipalSummary, AuthError> {
        ensure_can_grant_in_tenant(actor, input.role)?;
        self.create_principal(NewPrincipal {
            email: input.email,
            display_name: input.display_name,
            password: input.password,
            role: input.role,
            tenant_id: Some(tenant.id),
        })
        .await
    }

    pub async fn deactivate_member(
        &self,
        actor: &Principal,
        tenant: &Tenant,
        id: PrincipalId,
    ) -> Result<PrincipalSummary, AuthError> {
        let target = self.load(id).await?;
        ensure_can_deactivate_in_tenant(actor, &target, tenant)?;
        let updated = self
            .store
            .set_active(id, false)
            .await?
            .ok_or(AuthError::NotFound)?;
        tracing::info!(principal_id = %id, tenant_id = %tenant.id, "member deactivated");
        Ok(updated.summary(Some(tenant)))
    }

    /// Summary of `id` with its tenant slug resolved.
    pub async fn describe(&self, id: PrincipalId) -> Result<PrincipalSummary, AuthError> {
        let principal = self.load(id).await?;
        self.summarize(principal).await
    }

    async fn detail(&self, tenant: Tenant) -> Result<TenantDetail, AuthError> {
        let user_count = self
            .store
            .list_principals(PrincipalFilter::tenant(tenant.id))
            .await?
            .len();
        Ok(TenantDetail { tenant, user_count })
    }

    async fn load(&self, id: PrincipalId) -> Result<Principal, AuthError> {
        self.store.find_by_id(id).await?.ok_or(AuthError::NotFound)
    }

    async fn summarize(&self, principal: Principal) -> Result<PrincipalSummary, AuthError> {
        let tenant = match principal.tenant_id {
            Some(id) => self.store.find_tenant_by_id(id).await?,
            None => None,
        };
        Ok(principal.summary(tenant.as_ref()))
    }
}
