use std::sync::Arc;

use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
};

use aluguetudo_auth::{HOME_PATH, LOGIN_PATH};
use aluguetudo_portal::{BootstrapOutcome, NoticeLog, PortalError};

use crate::app::services::{AppServices, ServiceError};
use crate::app::{dto, errors};
use crate::context::{PrincipalContext, SessionContext};

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CredentialsRequest>,
) -> axum::response::Response {
    let notices = Arc::new(NoticeLog::new());

    match services.login(&body.email, &body.password, notices.clone()).await {
        Ok(issued) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "token": issued.token,
                "token_type": "Bearer",
                "expires_at": issued.expires_at,
                "principal": issued.principal,
                "redirect": HOME_PATH,
                "notices": notices.drain(),
            })),
        )
            .into_response(),
        Err(ServiceError::Portal(PortalError::MissingCredentials)) => errors::json_error_with_notices(
            StatusCode::BAD_REQUEST,
            "missing_credentials",
            "email and password are required",
            notices.drain(),
        ),
        Err(ServiceError::Portal(e)) if e.is_backend_outage() => {
            errors::portal_error_to_response(e, notices.drain())
        }
        Err(ServiceError::Portal(e)) => (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "error": "invalid_credentials",
                "message": e.to_string(),
                "route": LOGIN_PATH,
                "notices": notices.drain(),
            })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e, notices.drain()),
    }
}

pub async fn logout(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Extension(session): Extension<SessionContext>,
) -> StatusCode {
    services.logout(&session, &principal).await;
    StatusCode::NO_CONTENT
}

pub async fn bootstrap_admin(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CredentialsRequest>,
) -> axum::response::Response {
    let notices = Arc::new(NoticeLog::new());

    match services
        .bootstrap_admin(&body.email, &body.password, notices.clone())
        .await
    {
        Ok(BootstrapOutcome::Created(id)) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "id": id.to_string(),
                "notices": notices.drain(),
            })),
        )
            .into_response(),
        Ok(BootstrapOutcome::AlreadyExists) => errors::json_error_with_notices(
            StatusCode::CONFLICT,
            "admin_exists",
            "an administrator already exists",
            notices.drain(),
        ),
        Err(e) => errors::portal_error_to_response(e, notices.drain()),
    }
}
