//! Login, logout and the caller's own profile.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;

use tessera_auth::{AuthError, Capability};

use crate::app::dto::{LoginRequest, LoginResponse};
use crate::app::errors::{ApiError, LOGIN_FAILED, json_error};
use crate::app::extract::ApiJson;
use crate::app::routes::guarded;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router(services: Arc<AppServices>) -> Router {
    let protected = guarded(
        Router::new()
            .route("/logout", post(logout))
            .route("/me", get(me)),
        services,
        Capability::Member,
    );

    Router::new().route("/login", post(login)).merge(protected)
}

/// POST /api/auth/login
///
/// Every credential failure produces the same body.
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Response {
    match services.auth.login(&body.email, &body.password).await {
        Ok(outcome) => Json(LoginResponse::from(outcome)).into_response(),
        Err(AuthError::Unauthenticated) => {
            json_error(StatusCode::UNAUTHORIZED, "unauthenticated", LOGIN_FAILED)
        }
        Err(err) => ApiError::from(err).into_response(),
    }
}

/// POST /api/auth/logout
///
/// Tokens are stateless; the client discards its copy.
pub async fn logout(Extension(principal): Extension<PrincipalContext>) -> impl IntoResponse {
    tracing::info!(principal_id = %principal.principal().id, "logout");
    Json(json!({ "message": "logged out" }))
}

/// GET /api/auth/me
pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = services.admin.describe(principal.principal().id).await?;
    Ok(Json(summary))
}
