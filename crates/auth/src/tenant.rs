use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tessera_core::{DomainError, TenantId, TenantSlug};

/// Lifecycle state of a tenant.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    #[default]
    Active,
    Suspended,
    /// Terminal for access decisions: an archived tenant is treated as absent
    /// and its slug may be reused.
    Archived,
}

impl TenantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantStatus::Active => "active",
            TenantStatus::Suspended => "suspended",
            TenantStatus::Archived => "archived",
        }
    }
}

impl core::fmt::Display for TenantStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TenantStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(TenantStatus::Active),
            "suspended" => Ok(TenantStatus::Suspended),
            "archived" => Ok(TenantStatus::Archived),
            other => Err(DomainError::validation(format!("unknown tenant status '{other}'"))),
        }
    }
}

/// A customer organisation: the unit of data partitioning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub slug: TenantSlug,
    pub name: String,
    pub status: TenantStatus,
    pub created_at: DateTime<Utc>,
}

impl Tenant {
    pub fn new(slug: TenantSlug, name: impl Into<String>) -> Result<Self, DomainError> {
        Ok(Self {
            id: TenantId::new(),
            slug,
            name: Self::normalize_name(name)?,
            status: TenantStatus::Active,
            created_at: Utc::now(),
        })
    }

    /// Trimmed display name; blank names are rejected.
    pub fn normalize_name(name: impl Into<String>) -> Result<String, DomainError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("tenant name is required"));
        }
        Ok(name)
    }

    pub fn is_archived(&self) -> bool {
        self.status == TenantStatus::Archived
    }

    pub fn is_active(&self) -> bool {
        self.status == TenantStatus::Active
    }
}
