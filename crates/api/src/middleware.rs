use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::Span;

use tessera_auth::{Capability, TenantResolver};

use crate::app::errors::{ApiError, unauthenticated};
use crate::app::services::AppServices;
use crate::context::{RequestTenant, from_access};

/// Attach the tenant claimed by the path to every request and record it on
/// the request span.
pub async fn tenant_context(
    State(resolver): State<Arc<TenantResolver>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let candidate = resolver.resolve(req.uri().path());
    if let Some(candidate) = &candidate {
        Span::current().record("tenant", candidate.as_str());
    }
    req.extensions_mut().insert(RequestTenant(candidate));
    next.run(req).await
}

/// State of one [`require`] layer: the services plus the capability its
/// routes demand.
#[derive(Clone)]
pub struct Guarded {
    pub services: Arc<AppServices>,
    pub capability: Capability,
}

impl Guarded {
    pub fn new(services: Arc<AppServices>, capability: Capability) -> Self {
        Self {
            services,
            capability,
        }
    }
}

/// Authorize the request for the layer's capability.
///
/// On success the principal (and the admitted tenant, if the path named one)
/// are inserted into the request extensions.
pub async fn require(
    State(guarded): State<Guarded>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = match extract_bearer(req.headers()) {
        Ok(token) => token.to_string(),
        Err(res) => return res,
    };
    let candidate = req
        .extensions()
        .get::<RequestTenant>()
        .and_then(|t| t.candidate().cloned());

    let access = match guarded
        .services
        .guard
        .authorize(&token, guarded.capability, candidate.as_ref())
        .await
    {
        Ok(access) => access,
        Err(err) => return ApiError::from(err).into_response(),
    };

    Span::current().record("principal_id", tracing::field::display(access.principal.id));
    let (principal, tenant) = from_access(access);
    req.extensions_mut().insert(principal);
    if let Some(tenant) = tenant {
        req.extensions_mut().insert(tenant);
    }

    next.run(req).await
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, Response> {
    let malformed = || unauthenticated("missing or malformed bearer token");

    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(malformed)?;

    let header = header.to_str().map_err(|_| malformed())?;

    let (scheme, token) = header.split_once(' ').ok_or_else(malformed)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(malformed());
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(malformed());
    }

    Ok(token)
}
