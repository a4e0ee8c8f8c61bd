use std::sync::Arc;

use axum::{Router, middleware::from_fn_with_state, routing::get};

use tessera_auth::Capability;

use crate::app::services::{AppServices, TENANT_MOUNT};
use crate::middleware::{Guarded, require};

pub mod admin;
pub mod auth;
pub mod companies;
pub mod system;

/// Router for every endpoint.
pub fn router(services: Arc<AppServices>) -> Router {
    Router::new()
        .route("/health", get(system::health))
        .nest("/api/auth", auth::router(services.clone()))
        .nest("/api/admin", admin::router(services.clone()))
        .nest(&format!("{TENANT_MOUNT}/:slug"), companies::router(services))
}

/// Protect every route already registered on `router` with `capability`.
pub(crate) fn guarded(router: Router, services: Arc<AppServices>, capability: Capability) -> Router {
    router.route_layer(from_fn_with_state(Guarded::new(services, capability), require))
}
