//! Request/response DTOs and JSON mapping helpers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tessera_auth::{
    AuthError, LoginOutcome, Page, PrincipalFilter, PrincipalSummary, Role, TenantStatus,
};
use tessera_core::{PrincipalId, TenantId};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
    pub user: UserView,
}

/// Compact principal view returned at login.
#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: PrincipalId,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub tenant_id: Option<TenantId>,
    pub tenant_slug: Option<String>,
}

impl From<PrincipalSummary> for UserView {
    fn from(p: PrincipalSummary) -> Self {
        Self {
            id: p.id,
            email: p.email,
            display_name: p.display_name,
            role: p.role,
            tenant_id: p.tenant_id,
            tenant_slug: p.tenant_slug,
        }
    }
}

impl From<LoginOutcome> for LoginResponse {
    fn from(outcome: LoginOutcome) -> Self {
        Self {
            access_token: outcome.token,
            token_type: outcome.token_type,
            expires_at: outcome.expires_at,
            user: outcome.principal.into(),
        }
    }
}

/// `?skip=..&limit=..` on administrative listings.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub skip: Option<usize>,
    pub limit: Option<usize>,
}

impl PageQuery {
    pub fn page(&self) -> Result<Page, AuthError> {
        Page::new(self.skip, self.limit)
    }
}

/// `GET /api/admin/users?tenant_id=..&role=..&skip=..&limit=..`
#[derive(Debug, Default, Deserialize)]
pub struct ListUsersQuery {
    pub tenant_id: Option<TenantId>,
    pub role: Option<String>,
    pub skip: Option<usize>,
    pub limit: Option<usize>,
}

impl ListUsersQuery {
    pub fn into_filter(self) -> Result<(PrincipalFilter, Page), AuthError> {
        let role = self.role.as_deref().map(str::parse::<Role>).transpose()?;
        let filter = PrincipalFilter {
            tenant_id: self.tenant_id,
            role,
        };
        Ok((filter, Page::new(self.skip, self.limit)?))
    }
}

#[derive(Debug, Deserialize)]
pub struct RenameTenantRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct TenantStatusRequest {
    pub status: String,
}

impl TenantStatusRequest {
    pub fn status(&self) -> Result<TenantStatus, AuthError> {
        Ok(self.status.parse()?)
    }
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: String,
    #[serde(default)]
    pub tenant_id: Option<TenantId>,
}

impl RoleRequest {
    pub fn role(&self) -> Result<Role, AuthError> {
        Ok(self.role.parse()?)
    }
}
