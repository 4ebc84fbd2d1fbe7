use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use aluguetudo_core::DomainError;
use aluguetudo_gateway::GatewayError;
use aluguetudo_portal::{Notice, PortalError};

use crate::app::services::ServiceError;

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// [`json_error`] plus the notices the failed workflow emitted.
pub fn json_error_with_notices(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
    notices: Vec<Notice>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
            "notices": notices,
        })),
    )
        .into_response()
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
    }
}

pub fn portal_error_to_response(err: PortalError, notices: Vec<Notice>) -> axum::response::Response {
    let (status, code) = match &err {
        PortalError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
        PortalError::MissingCredentials => (StatusCode::BAD_REQUEST, "missing_credentials"),
        PortalError::InvalidBootstrapCredentials => {
            (StatusCode::BAD_REQUEST, "invalid_bootstrap_credentials")
        }
        PortalError::NotAuthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated"),
        PortalError::SessionExpired => (StatusCode::UNAUTHORIZED, "session_expired"),
        PortalError::Domain(DomainError::NotFound) => (StatusCode::NOT_FOUND, "not_found"),
        PortalError::Domain(_) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_record"),
        PortalError::Gateway(GatewayError::NotFound(_)) => (StatusCode::NOT_FOUND, "not_found"),
        PortalError::Gateway(_) => (StatusCode::BAD_GATEWAY, "backend_error"),
    };
    json_error_with_notices(status, code, err.to_string(), notices)
}

pub fn service_error_to_response(err: ServiceError, notices: Vec<Notice>) -> axum::response::Response {
    match err {
        ServiceError::Portal(e) => portal_error_to_response(e, notices),
        ServiceError::TokenIssue(msg) => {
            json_error_with_notices(StatusCode::INTERNAL_SERVER_ERROR, "token_error", msg, notices)
        }
    }
}

pub fn forbidden(err: aluguetudo_auth::AuthzError) -> axum::response::Response {
    json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string())
}
