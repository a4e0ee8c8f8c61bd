use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use tessera_auth::AuthError;

/// Message of every failed login, whatever the cause.
pub const LOGIN_FAILED: &str = "invalid email or password";

/// HTTP face of [`AuthError`] and of request extraction failures.
#[derive(Debug)]
pub enum ApiError {
    Auth(AuthError),
    /// The request could not be decoded (body, path or query).
    Rejected { status: StatusCode, message: String },
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::Auth(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = match self {
            ApiError::Auth(err) => err,
            ApiError::Rejected { status, message } => {
                return json_error(status, "invalid_request", message);
            }
        };
        match err {
            AuthError::Unauthenticated => unauthenticated("authentication required"),
            AuthError::Forbidden(reason) => json_error(StatusCode::FORBIDDEN, "forbidden", reason),
            AuthError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
            AuthError::Unavailable => json_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "unavailable",
                "service temporarily unavailable",
            ),
            AuthError::Invalid(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_request", msg),
            AuthError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        }
    }
}

/// 401 with a bearer challenge.
pub fn unauthenticated(message: &'static str) -> Response {
    let mut res = json_error(StatusCode::UNAUTHORIZED, "unauthenticated", message);
    res.headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    res
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
