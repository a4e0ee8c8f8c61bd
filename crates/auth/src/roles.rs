use core::str::FromStr;

use serde::{Deserialize, Serialize};

use tessera_core::DomainError;

/// Role identifier used for RBAC.
///
/// Variants are declared in ascending order of privilege, so the derived
/// `Ord` is the capability order: `TenantStaff < TenantOwner < PlatformAdmin`.
/// Serializes to the canonical name; deserializes through [`FromStr`], so the
/// legacy spellings are accepted everywhere a role is read.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum Role {
    TenantStaff,
    TenantOwner,
    PlatformAdmin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::TenantStaff, Role::TenantOwner, Role::PlatformAdmin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::TenantStaff => "tenant_staff",
            Role::TenantOwner => "tenant_owner",
            Role::PlatformAdmin => "platform_admin",
        }
    }

    /// Platform admins are the only role not bound to a tenant.
    pub fn is_platform(&self) -> bool {
        matches!(self, Role::PlatformAdmin)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    /// Accepts the canonical names plus the legacy spellings still found in
    /// older records (`admin`, `owner`, `company_owner`, `staff`, `company_staff`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "platform_admin" | "admin" => Ok(Role::PlatformAdmin),
            "tenant_owner" | "owner" | "company_owner" => Ok(Role::TenantOwner),
            "tenant_staff" | "staff" | "company_staff" => Ok(Role::TenantStaff),
            other => Err(DomainError::validation(format!("unknown role '{other}'"))),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// What a protected operation demands of the caller's role.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Any authenticated, active principal.
    Member,
    /// Tenant owner or above.
    Manage,
    /// Platform admin only.
    Platform,
}

impl Capability {
    pub fn minimum_role(&self) -> Role {
        match self {
            Capability::Member => Role::TenantStaff,
            Capability::Manage => Role::TenantOwner,
            Capability::Platform => Role::PlatformAdmin,
        }
    }

    pub fn permits(&self, role: Role) -> bool {
        role >= self.minimum_role()
    }
}
