use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tessera_core::{DomainError, Email, PrincipalId, TenantId};

use crate::Role;
use crate::tenant::Tenant;

/// A stored user account, as the auth boundary sees it.
///
/// # Invariants
/// - `role == PlatformAdmin` ⇔ `tenant_id.is_none()`.
/// - Never hard-deleted; deactivation is modelled by `active = false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub email: Email,
    pub display_name: String,
    pub password_digest: String,
    pub role: Role,
    pub tenant_id: Option<TenantId>,
    pub active: bool,
    pub last_authenticated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Principal {
    /// Build a new, active principal.
    pub fn new(
        email: Email,
        display_name: impl Into<String>,
        password_digest: String,
        role: Role,
        tenant_id: Option<TenantId>,
    ) -> Result<Self, DomainError> {
        ensure_role_binding(role, tenant_id)?;
        let display_name = display_name.into().trim().to_string();
        if display_name.is_empty() {
            return Err(DomainError::validation("display name is required"));
        }
        Ok(Self {
            id: PrincipalId::new(),
            email,
            display_name,
            password_digest,
            role,
            tenant_id,
            active: true,
            last_authenticated_at: None,
            created_at: Utc::now(),
        })
    }

    /// True when the stored record satisfies the role/tenant invariant.
    pub fn is_well_formed(&self) -> bool {
        ensure_role_binding(self.role, self.tenant_id).is_ok()
    }

    pub fn summary(&self, tenant: Option<&Tenant>) -> PrincipalSummary {
        PrincipalSummary {
            id: self.id,
            email: self.email.as_str().to_string(),
            display_name: self.display_name.clone(),
            role: self.role,
            tenant_id: self.tenant_id,
            tenant_slug: tenant.map(|t| t.slug.as_str().to_string()),
            active: self.active,
            last_authenticated_at: self.last_authenticated_at,
        }
    }
}

/// Enforce `role == PlatformAdmin` ⇔ no tenant.
pub fn ensure_role_binding(role: Role, tenant_id: Option<TenantId>) -> Result<(), DomainError> {
    match (role.is_platform(), tenant_id) {
        (true, None) | (false, Some(_)) => Ok(()),
        (true, Some(_)) => Err(DomainError::invariant(
            "platform admins cannot be bound to a tenant",
        )),
        (false, None) => Err(DomainError::invariant(format!(
            "role '{role}' requires a tenant"
        ))),
    }
}

/// Client-facing view of a principal. The slug is denormalised for
/// convenience and never authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalSummary {
    pub id: PrincipalId,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub tenant_id: Option<TenantId>,
    pub tenant_slug: Option<String>,
    pub active: bool,
    pub last_authenticated_at: Option<DateTime<Utc>>,
}
