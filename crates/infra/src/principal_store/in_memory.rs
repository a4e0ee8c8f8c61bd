use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use tessera_auth::store::select_slug_owner;
use tessera_auth::{
    Directory, Principal, PrincipalFilter, PrincipalStore, Role, StoreError, StoreResult, Tenant,
    TenantStatus,
};
use tessera_core::{Email, PrincipalId, TenantId};

#[derive(Debug, Default)]
struct State {
    principals: HashMap<PrincipalId, Principal>,
    tenants: HashMap<TenantId, Tenant>,
}

impl State {
    fn live_slug_taken(&self, tenant: &Tenant) -> bool {
        self.tenants
            .values()
            .any(|t| t.id != tenant.id && t.slug == tenant.slug && !t.is_archived())
    }
}

/// In-memory principal store for tests/dev.
///
/// A poisoned lock is reported as [`StoreError::Unavailable`] rather than
/// propagated as a panic.
#[derive(Debug, Default)]
pub struct InMemoryPrincipalStore {
    inner: RwLock<State>,
}

impl InMemoryPrincipalStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Unavailable("principal store lock poisoned".into()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Unavailable("principal store lock poisoned".into()))
    }
}

#[async_trait]
impl PrincipalStore for InMemoryPrincipalStore {
    async fn find_by_id(&self, id: PrincipalId) -> StoreResult<Option<Principal>> {
        Ok(self.read()?.principals.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &Email) -> StoreResult<Option<Principal>> {
        Ok(self
            .read()?
            .principals
            .values()
            .find(|p| &p.email == email)
            .cloned())
    }

    async fn find_tenant_by_slug(&self, slug: &str) -> StoreResult<Option<Tenant>> {
        let state = self.read()?;
        Ok(select_slug_owner(state.tenants.values(), slug).cloned())
    }

    async fn find_tenant_by_id(&self, id: TenantId) -> StoreResult<Option<Tenant>> {
        Ok(self.read()?.tenants.get(&id).cloned())
    }

    async fn touch_last_authenticated(&self, id: PrincipalId, at: DateTime<Utc>) -> StoreResult<()> {
        if let Some(p) = self.write()?.principals.get_mut(&id) {
            p.last_authenticated_at = Some(at);
        }
        Ok(())
    }
}

#[async_trait]
impl Directory for InMemoryPrincipalStore {
    async fn insert_tenant(&self, tenant: Tenant) -> StoreResult<Tenant> {
        let mut state = self.write()?;
        if state.tenants.contains_key(&tenant.id) {
            return Err(StoreError::Conflict(format!("tenant {} already exists", tenant.id)));
        }
        if !tenant.is_archived() && state.live_slug_taken(&tenant) {
            return Err(StoreError::Conflict(format!("slug '{}' is taken", tenant.slug)));
        }
        state.tenants.insert(tenant.id, tenant.clone());
        Ok(tenant)
    }

    async fn set_tenant_status(
        &self,
        id: TenantId,
        status: TenantStatus,
    ) -> StoreResult<Option<Tenant>> {
        let mut state = self.write()?;
        let Some(current) = state.tenants.get(&id).cloned() else {
            return Ok(None);
        };
        if current.is_archived() && status != TenantStatus::Archived && state.live_slug_taken(&current) {
            return Err(StoreError::Conflict(format!(
                "slug '{}' is held by another tenant",
                current.slug
            )));
        }
        let Some(tenant) = state.tenants.get_mut(&id) else {
            return Ok(None);
        };
        tenant.status = status;
        Ok(Some(tenant.clone()))
    }

    async fn rename_tenant(&self, id: TenantId, name: String) -> StoreResult<Option<Tenant>> {
        let mut state = self.write()?;
        Ok(state.tenants.get_mut(&id).map(|t| {
            t.name = name;
            t.clone()
        }))
    }

    async fn list_tenants(&self) -> StoreResult<Vec<Tenant>> {
        let mut tenants: Vec<Tenant> = self.read()?.tenants.values().cloned().collect();
        tenants.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.slug.as_str().cmp(b.slug.as_str())));
        Ok(tenants)
    }

    async fn insert_principal(&self, principal: Principal) -> StoreResult<Principal> {
        let mut state = self.write()?;
        if state.principals.contains_key(&principal.id) {
            return Err(StoreError::Conflict(format!(
                "principal {} already exists",
                principal.id
            )));
        }
        if state.principals.values().any(|p| p.email == principal.email) {
            return Err(StoreError::Conflict(format!(
                "email '{}' is already registered",
                principal.email
            )));
        }
        state.principals.insert(principal.id, principal.clone());
        Ok(principal)
    }

    async fn set_active(&self, id: PrincipalId, active: bool) -> StoreResult<Option<Principal>> {
        let mut state = self.write()?;
        Ok(state.principals.get_mut(&id).map(|p| {
            p.active = active;
            p.clone()
        }))
    }

    async fn set_role(
        &self,
        id: PrincipalId,
        role: Role,
        tenant_id: Option<TenantId>,
    ) -> StoreResult<Option<Principal>> {
        let mut state = self.write()?;
        Ok(state.principals.get_mut(&id).map(|p| {
            p.role = role;
            p.tenant_id = tenant_id;
            p.clone()
        }))
    }

    async fn list_principals(&self, filter: PrincipalFilter) -> StoreResult<Vec<Principal>> {
        let mut principals: Vec<Principal> = self
            .read()?
            .principals
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        principals.sort_by(|a, b| a.email.as_str().cmp(b.email.as_str()));
        Ok(principals)
    }
}
