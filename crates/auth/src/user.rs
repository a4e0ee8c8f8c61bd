//! User-management rules.
//!
//! Pure policy over already-authorized actors; no IO. The rules implement
//! privilege escalation prevention:
//! - an actor can grant at most its own role
//! - platform admins are only created from platform routes
//! - nobody deactivates or demotes themselves

use serde::Deserialize;

use tessera_core::{Email, TenantId};

use crate::Role;
use crate::error::AuthError;
use crate::password::validate_password_strength;
use crate::principal::{Principal, ensure_role_binding};
use crate::tenant::Tenant;

/// Input for creating a principal.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewPrincipal {
    pub email: String,
    pub display_name: String,
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub tenant_id: Option<TenantId>,
}

/// A [`NewPrincipal`] whose fields passed validation.
#[derive(Debug, Clone)]
pub struct ValidatedPrincipal {
    pub email: Email,
    pub display_name: String,
    pub password: String,
    pub role: Role,
    pub tenant_id: Option<TenantId>,
}

impl NewPrincipal {
    pub fn validate(self, min_password_length: usize) -> Result<ValidatedPrincipal, AuthError> {
        let email = Email::parse(&self.email)?;
        let display_name = self.display_name.trim().to_string();
        if display_name.is_empty() {
            return Err(AuthError::Invalid("display name is required".into()));
        }
        validate_password_strength(&self.password, min_password_length).map_err(AuthError::Invalid)?;
        ensure_role_binding(self.role, self.tenant_id)?;
        Ok(ValidatedPrincipal {
            email,
            display_name,
            password: self.password,
            role: self.role,
            tenant_id: self.tenant_id,
        })
    }
}

/// Roles an actor may hand out from a tenant-scoped route.
pub fn ensure_can_grant_in_tenant(actor: &Principal, role: Role) -> Result<(), AuthError> {
    if role.is_platform() {
        return Err(AuthError::Forbidden("platform admins cannot be created here"));
    }
    if role > actor.role {
        return Err(AuthError::Forbidden("cannot grant a role above your own"));
    }
    Ok(())
}

/// Whether `actor` may deactivate `target` from inside `tenant`.
///
/// Returns `NotFound` for principals outside the tenant so members of other
/// tenants cannot be enumerated.
pub fn ensure_can_deactivate_in_tenant(
    actor: &Principal,
    target: &Principal,
    tenant: &Tenant,
) -> Result<(), AuthError> {
    if target.tenant_id != Some(tenant.id) {
        return Err(AuthError::NotFound);
    }
    if actor.id == target.id {
        return Err(AuthError::Forbidden("cannot deactivate yourself"));
    }
    if !actor.role.is_platform() && target.role >= actor.role {
        return Err(AuthError::Forbidden("can only deactivate lower roles"));
    }
    Ok(())
}

/// Guard for platform-level changes an admin makes to an account.
pub fn ensure_not_self(actor: &Principal, target: &Principal) -> Result<(), AuthError> {
    if actor.id == target.id {
        return Err(AuthError::Forbidden("cannot change your own account"));
    }
    Ok(())
}

/// Tenants that can receive new principals.
pub fn ensure_assignable(tenant: Option<&Tenant>) -> Result<(), AuthError> {
    match tenant {
        Some(t) if !t.is_archived() => Ok(()),
        Some(_) => Err(AuthError::Invalid("tenant is archived".into())),
        None => Err(AuthError::Invalid("tenant does not exist".into())),
    }
}

#[cfg(test)]
mod tests {
    use tessera_core::TenantSlug;

    use super::*;
    use crate::tenant::TenantStatus;

    fn tenant() -> Tenant {
        Tenant::new(TenantSlug::parse("acme").unwrap(), "Acme").unwrap()
    }

    fn principal(role: Role, tenant: Option<&Tenant>) -> Principal {
        Principal::new(
            Email::parse(&format!("{}@acme.test", tessera_core::PrincipalId::new())).unwrap(),
            "Someone",
            "digest".into(),
            role,
            tenant.map(|t| t.id),
        )
        .unwrap()
    }

    fn new_principal(role: Role, tenant_id: Option<TenantId>) -> NewPrincipal {
        NewPrincipal {
            email: "New@Acme.test".into(),
            display_name: "New".into(),
            password: "Password1".into(),
            role,
            tenant_id,
        }
    }

    #[test]
    fn validation_normalises_and_checks_binding() {
        let t = tenant();
        let v = new_principal(Role::TenantStaff, Some(t.id)).validate(8).unwrap();
        assert_eq!(v.email.as_str(), "new@acme.test");

        assert!(matches!(
            new_principal(Role::TenantStaff, None).validate(8),
            Err(AuthError::Invalid(_))
        ));
        assert!(matches!(
            new_principal(Role::PlatformAdmin, Some(t.id)).validate(8),
            Err(AuthError::Invalid(_))
        ));
    }

    #[test]
    fn weak_password_is_invalid() {
        let mut input = new_principal(Role::PlatformAdmin, None);
        input.password = "short1".into();
        assert!(matches!(input.validate(8), Err(AuthError::Invalid(_))));
    }

    #[test]
    fn staff_cannot_grant_owner_and_nobody_grants_admin() {
        let t = tenant();
        let staff = principal(Role::TenantStaff, Some(&t));
        let owner = principal(Role::TenantOwner, Some(&t));
        let admin = principal(Role::PlatformAdmin, None);

        assert!(ensure_can_grant_in_tenant(&staff, Role::TenantStaff).is_ok());
        assert!(ensure_can_grant_in_tenant(&staff, Role::TenantOwner).is_err());
        assert!(ensure_can_grant_in_tenant(&owner, Role::TenantOwner).is_ok());
        assert!(ensure_can_grant_in_tenant(&owner, Role::PlatformAdmin).is_err());
        assert!(ensure_can_grant_in_tenant(&admin, Role::PlatformAdmin).is_err());
    }

    #[test]
    fn owners_deactivate_staff_but_not_themselves_or_peers() {
        let t = tenant();
        let owner = principal(Role::TenantOwner, Some(&t));
        let peer = principal(Role::TenantOwner, Some(&t));
        let staff = principal(Role::TenantStaff, Some(&t));

        assert!(ensure_can_deactivate_in_tenant(&owner, &staff, &t).is_ok());
        assert_eq!(
            ensure_can_deactivate_in_tenant(&owner, &owner, &t),
            Err(AuthError::Forbidden("cannot deactivate yourself"))
        );
        assert!(ensure_can_deactivate_in_tenant(&owner, &peer, &t).is_err());
    }

    #[test]
    fn targets_outside_the_tenant_are_not_found() {
        let t = tenant();
        let other = Tenant::new(TenantSlug::parse("othertenant").unwrap(), "Other").unwrap();
        let owner = principal(Role::TenantOwner, Some(&t));
        let stranger = principal(Role::TenantStaff, Some(&other));
        assert_eq!(
            ensure_can_deactivate_in_tenant(&owner, &stranger, &t),
            Err(AuthError::NotFound)
        );
    }

    #[test]
    fn archived_tenants_are_not_assignable() {
        let mut t = tenant();
        assert!(ensure_assignable(Some(&t)).is_ok());
        t.status = TenantStatus::Archived;
        assert!(ensure_assignable(Some(&t)).is_err());
        assert!(ensure_assignable(None).is_err());
    }
}
