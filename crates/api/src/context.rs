use tessera_auth::{Access, Claims, Principal, Tenant, TenantCandidate};

/// Tenant claimed by the request path, before any authorization.
///
/// Inserted for every request by the resolver middleware; `None` when the
/// path names no tenant.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestTenant(pub Option<TenantCandidate>);

impl RequestTenant {
    pub fn candidate(&self) -> Option<&TenantCandidate> {
        self.0.as_ref()
    }
}

/// Tenant context for a request.
///
/// Only present on tenant-scoped routes, after the access guard admitted the
/// principal to the tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    tenant: Tenant,
}

impl TenantContext {
    pub fn new(tenant: Tenant) -> Self {
        Self { tenant }
    }

    pub fn tenant(&self) -> &Tenant {
        &self.tenant
    }
}

/// Principal context for a request (freshly loaded principal + token claims).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
    claims: Claims,
}

impl PrincipalContext {
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }
}

/// Split a guard decision into the request extensions it populates.
pub fn from_access(access: Access) -> (PrincipalContext, Option<TenantContext>) {
    (
        PrincipalContext {
            principal: access.principal,
            claims: access.claims,
        },
        access.tenant.map(TenantContext::new),
    )
}
