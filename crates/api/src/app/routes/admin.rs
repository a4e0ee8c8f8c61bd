//! Platform administration: tenants and principals across all tenants.
//!
//! Every route requires the `Platform` capability.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post, put},
};

use tessera_auth::{Capability, NewPrincipal, NewTenant};
use tessera_core::{PrincipalId, TenantId};

use crate::app::dto::{ListUsersQuery, PageQuery, RenameTenantRequest, RoleRequest, TenantStatusRequest};
use crate::app::errors::ApiError;
use crate::app::extract::{ApiJson, ApiPath, ApiQuery};
use crate::app::routes::guarded;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router(services: Arc<AppServices>) -> Router {
    let routes = Router::new()
        .route("/dashboard/stats", get(stats))
        .route("/tenants", get(list_tenants).post(create_tenant))
        .route(
            "/tenants/:id",
            get(get_tenant).put(rename_tenant).delete(archive_tenant),
        )
        .route("/tenants/:id/status", patch(set_tenant_status))
        .route("/users", get(list_users).post(create_user))
        .route("/users/:id/activate", post(activate_user))
        .route("/users/:id/deactivate", post(deactivate_user))
        .route("/users/:id/role", put(set_role));
    guarded(routes, services, Capability::Platform)
}

/// GET /api/admin/dashboard/stats
pub async fn stats(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(services.admin.stats().await?))
}

/// GET /api/admin/tenants
pub async fn list_tenants(
    Extension(services): Extension<Arc<AppServices>>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(services.admin.list_tenants(query.page()?).await?))
}

/// POST /api/admin/tenants
pub async fn create_tenant(
    Extension(services): Extension<Arc<AppServices>>,
    ApiJson(body): ApiJson<NewTenant>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = services.admin.create_tenant(body).await?;
    Ok((StatusCode::CREATED, Json(tenant)))
}

/// GET /api/admin/tenants/:id
pub async fn get_tenant(
    Extension(services): Extension<Arc<AppServices>>,
    ApiPath(id): ApiPath<TenantId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(services.admin.get_tenant(id).await?))
}

/// PUT /api/admin/tenants/:id
pub async fn rename_tenant(
    Extension(services): Extension<Arc<AppServices>>,
    ApiPath(id): ApiPath<TenantId>,
    ApiJson(body): ApiJson<RenameTenantRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(services.admin.rename_tenant(id, body.name).await?))
}

/// DELETE /api/admin/tenants/:id
///
/// Archives; tenants are never hard-deleted.
pub async fn archive_tenant(
    Extension(services): Extension<Arc<AppServices>>,
    ApiPath(id): ApiPath<TenantId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(services.admin.archive_tenant(id).await?))
}

/// PATCH /api/admin/tenants/:id/status
pub async fn set_tenant_status(
    Extension(services): Extension<Arc<AppServices>>,
    ApiPath(id): ApiPath<TenantId>,
    ApiJson(body): ApiJson<TenantStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = services.admin.set_tenant_status(id, body.status()?).await?;
    Ok(Json(tenant))
}

/// GET /api/admin/users
pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    ApiQuery(query): ApiQuery<ListUsersQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (filter, page) = query.into_filter()?;
    let users = services.admin.list_principals(filter, page).await?;
    Ok(Json(users))
}

/// POST /api/admin/users
pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    ApiJson(body): ApiJson<NewPrincipal>,
) -> Result<impl IntoResponse, ApiError> {
    let user = services.admin.create_principal(body).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /api/admin/users/:id/activate
pub async fn activate_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<PrincipalContext>,
    ApiPath(id): ApiPath<PrincipalId>,
) -> Result<impl IntoResponse, ApiError> {
    let user = services.admin.set_active(actor.principal(), id, true).await?;
    Ok(Json(user))
}

/// POST /api/admin/users/:id/deactivate
pub async fn deactivate_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<PrincipalContext>,
    ApiPath(id): ApiPath<PrincipalId>,
) -> Result<impl IntoResponse, ApiError> {
    let user = services.admin.set_active(actor.principal(), id, false).await?;
    Ok(Json(user))
}

/// PUT /api/admin/users/:id/role
pub async fn set_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<PrincipalContext>,
    ApiPath(id): ApiPath<PrincipalId>,
    ApiJson(body): ApiJson<RoleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = services
        .admin
        .set_role(actor.principal(), id, body.role()?, body.tenant_id)
        .await?;
    Ok(Json(user))
}
