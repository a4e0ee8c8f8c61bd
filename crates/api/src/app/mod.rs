//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store, codec, hasher and the auth services built on them
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses
//! - `extract.rs`: body/path/query extractors that reject with `errors.rs` bodies

use std::sync::Arc;

use axum::{Extension, Router, body::Body, http::Request, middleware::from_fn_with_state};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod extract;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(services: Arc<AppServices>) -> Router {
    let resolver = services.resolver.clone();

    routes::router(services.clone()).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                tracing::info_span!(
                    "http.request",
                    method = %req.method(),
                    path = %req.uri().path(),
                    tenant = tracing::field::Empty,
                    principal_id = tracing::field::Empty,
                )
            }))
            .layer(Extension(services))
            .layer(from_fn_with_state(resolver, middleware::tenant_context)),
    )
}
