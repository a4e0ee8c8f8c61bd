//! Storage seams of the auth boundary.
//!
//! [`PrincipalStore`] is the read path every request touches. [`Directory`]
//! holds the administrative mutations. Implementations live in
//! `tessera-infra`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use tessera_core::{Email, PrincipalId, TenantId, TenantSlug};

use crate::Role;
use crate::error::StoreError;
use crate::principal::Principal;
use crate::tenant::{Tenant, TenantStatus};

pub type StoreResult<T> = Result<T, StoreError>;

/// Lookups required for authentication and authorization.
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    async fn find_by_id(&self, id: PrincipalId) -> StoreResult<Option<Principal>>;

    async fn find_by_email(&self, email: &Email) -> StoreResult<Option<Principal>>;

    /// Resolve a slug to the tenant currently holding it. Archived tenants
    /// release their slug, so a live tenant is preferred over an archived one.
    async fn find_tenant_by_slug(&self, slug: &str) -> StoreResult<Option<Tenant>>;

    async fn find_tenant_by_id(&self, id: TenantId) -> StoreResult<Option<Tenant>>;

    /// Record a successful login. Last write wins.
    async fn touch_last_authenticated(&self, id: PrincipalId, at: DateTime<Utc>) -> StoreResult<()>;
}

/// Filter for principal listings. `None` means "any".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrincipalFilter {
    pub tenant_id: Option<TenantId>,
    pub role: Option<Role>,
}

impl PrincipalFilter {
    pub fn tenant(tenant_id: TenantId) -> Self {
        Self {
            tenant_id: Some(tenant_id),
            role: None,
        }
    }

    pub fn matches(&self, principal: &Principal) -> bool {
        self.tenant_id.is_none_or(|t| principal.tenant_id == Some(t))
            && self.role.is_none_or(|r| principal.role == r)
    }
}

/// Administrative mutations over tenants and principals.
///
/// Implementations enforce storage-level uniqueness (principal email, slug
/// among non-archived tenants) and report clashes as [`StoreError::Conflict`].
/// Updates of unknown ids return `Ok(None)`.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn insert_tenant(&self, tenant: Tenant) -> StoreResult<Tenant>;

    async fn set_tenant_status(
        &self,
        id: TenantId,
        status: TenantStatus,
    ) -> StoreResult<Option<Tenant>>;

    async fn rename_tenant(&self, id: TenantId, name: String) -> StoreResult<Option<Tenant>>;

    async fn list_tenants(&self) -> StoreResult<Vec<Tenant>>;

    async fn insert_principal(&self, principal: Principal) -> StoreResult<Principal>;

    async fn set_active(&self, id: PrincipalId, active: bool) -> StoreResult<Option<Principal>>;

    /// Change role and tenant binding together so the admin ⇔ no-tenant
    /// invariant never sees an intermediate state.
    async fn set_role(
        &self,
        id: PrincipalId,
        role: Role,
        tenant_id: Option<TenantId>,
    ) -> StoreResult<Option<Principal>>;

    async fn list_principals(&self, filter: PrincipalFilter) -> StoreResult<Vec<Principal>>;
}

/// Everything the HTTP surface needs from one backend.
pub trait Store: PrincipalStore + Directory {}

impl<T: PrincipalStore + Directory + ?Sized> Store for T {}

fn slug_matches(tenant: &Tenant, slug: &str) -> bool {
    tenant.slug.as_str() == slug
}

/// Pick the tenant that owns `slug`: the live one if any, otherwise the most
/// recently created archived one.
pub fn select_slug_owner<'a>(
    tenants: impl IntoIterator<Item = &'a Tenant>,
    slug: &str,
) -> Option<&'a Tenant> {
    let mut archived: Option<&Tenant> = None;
    for tenant in tenants.into_iter().filter(|t| slug_matches(t, slug)) {
        if !tenant.is_archived() {
            return Some(tenant);
        }
        if archived.is_none_or(|a| a.created_at < tenant.created_at) {
            archived = Some(tenant);
        }
    }
    archived
}

/// Parse-or-none: a slug that cannot be valid can never match a tenant.
pub fn parse_lookup_slug(slug: &str) -> Option<TenantSlug> {
    TenantSlug::parse(slug).ok()
}
