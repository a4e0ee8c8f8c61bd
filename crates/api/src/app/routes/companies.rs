//! Tenant-scoped routes under `/api/companies/:slug`.
//!
//! The access guard has already admitted the caller to the tenant named by
//! the path, so handlers read it from [`TenantContext`] and never from the
//! path or the token.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;

use tessera_auth::{Capability, NewMember};
use tessera_core::PrincipalId;

use crate::app::errors::ApiError;
use crate::app::extract::{ApiJson, ApiPath};
use crate::app::routes::guarded;
use crate::app::services::AppServices;
use crate::context::{PrincipalContext, TenantContext};

#[derive(Debug, Deserialize)]
pub struct MemberPath {
    pub id: PrincipalId,
}

pub fn router(services: Arc<AppServices>) -> Router {
    let members = guarded(
        Router::new()
            .route("/", get(tenant_summary))
            .route("/users", get(list_members)),
        services.clone(),
        Capability::Member,
    );
    let managers = guarded(
        Router::new()
            .route("/users", post(create_member))
            .route("/users/:id/deactivate", post(deactivate_member)),
        services,
        Capability::Manage,
    );
    members.merge(managers)
}

/// GET /api/companies/:slug
pub async fn tenant_summary(Extension(tenant): Extension<TenantContext>) -> impl IntoResponse {
    Json(tenant.tenant().clone())
}

/// GET /api/companies/:slug/users
pub async fn list_members(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(services.admin.tenant_members(tenant.tenant()).await?))
}

/// POST /api/companies/:slug/users
pub async fn create_member(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(actor): Extension<PrincipalContext>,
    ApiJson(body): ApiJson<NewMember>,
) -> Result<impl IntoResponse, ApiError> {
    let user = services
        .admin
        .create_member(actor.principal(), tenant.tenant(), body)
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /api/companies/:slug/users/:id/deactivate
pub async fn deactivate_member(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(actor): Extension<PrincipalContext>,
    ApiPath(MemberPath { id }): ApiPath<MemberPath>,
) -> Result<impl IntoResponse, ApiError> {
    let user = services
        .admin
        .deactivate_member(actor.principal(), tenant.tenant(), id)
        .await?;
    Ok(Json(user))
}
