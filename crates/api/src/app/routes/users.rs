//! User management (admin only).

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
};

use aluguetudo_auth::{UserDraft, views};
use aluguetudo_core::UserId;
use aluguetudo_portal::{PortalError, ProvisionOutcome, SaveOutcome};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::{PrincipalContext, SessionContext};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", patch(update_user).delete(delete_user))
}

fn parse_id(id: &str) -> Result<UserId, axum::response::Response> {
    id.parse::<UserId>()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid user id"))
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Extension(session): Extension<SessionContext>,
    Query(query): Query<dto::UsersQuery>,
) -> axum::response::Response {
    if let Err(e) = crate::authz::authorize_view(&principal, &views::USERS) {
        return errors::forbidden(e);
    }

    let mut ws = services.workspace(&session, &principal);
    if let Err(e) = ws.directory.fetch().await {
        return errors::portal_error_to_response(e, ws.notices.drain());
    }

    let q = query.q.unwrap_or_default();
    let items = ws.directory.filtered(&q);
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "items": items,
            "total": ws.directory.users().len(),
        })),
    )
        .into_response()
}

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Extension(session): Extension<SessionContext>,
    Json(mut draft): Json<UserDraft>,
) -> axum::response::Response {
    if let Err(e) = crate::authz::authorize_view(&principal, &views::USERS) {
        return errors::forbidden(e);
    }
    draft.id = None;

    save(services, principal, session, draft).await
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    Json(mut draft): Json<UserDraft>,
) -> axum::response::Response {
    if let Err(e) = crate::authz::authorize_view(&principal, &views::USERS) {
        return errors::forbidden(e);
    }
    draft.id = match parse_id(&id) {
        Ok(id) => Some(id),
        Err(resp) => return resp,
    };

    save(services, principal, session, draft).await
}

async fn save(
    services: Arc<AppServices>,
    principal: PrincipalContext,
    session: SessionContext,
    draft: UserDraft,
) -> axum::response::Response {
    let mut ws = services.workspace(&session, &principal);
    let result = ws
        .directory
        .save(&draft, &ws.provisioner, &mut ws.session)
        .await;
    services.sync_session(&session, &ws);
    let notices = ws.notices.drain();

    let outcome = match result {
        Ok(o) => o,
        Err(e) => return errors::portal_error_to_response(e, notices),
    };

    match outcome {
        SaveOutcome::Updated => (
            StatusCode::OK,
            Json(serde_json::json!({
                "id": draft.id.map(|id| id.to_string()),
                "notices": notices,
            })),
        )
            .into_response(),
        SaveOutcome::Provisioned(ProvisionOutcome::Created { user_id, via }) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "id": user_id.to_string(),
                "via": via.as_str(),
                "notices": notices,
            })),
        )
            .into_response(),
        SaveOutcome::Provisioned(ProvisionOutcome::ProfileIncomplete { user_id }) => (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({
                "id": user_id.to_string(),
                "status": "profile_incomplete",
                "notices": notices,
            })),
        )
            .into_response(),
        SaveOutcome::Provisioned(ProvisionOutcome::ReauthenticationRequired { redirect, after }) => (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "error": "reauthentication_required",
                "message": "session lost while creating the user; sign in again",
                "redirect": redirect,
                "redirect_after_ms": after.as_millis() as u64,
                "notices": notices,
            })),
        )
            .into_response(),
    }
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(e) = crate::authz::authorize_view(&principal, &views::USERS) {
        return errors::forbidden(e);
    }
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let mut ws = services.workspace(&session, &principal);
    if let Err(e) = ws.directory.fetch().await {
        return errors::portal_error_to_response(e, ws.notices.drain());
    }

    match ws.directory.delete(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(PortalError::Gateway(e)) => (
            StatusCode::BAD_GATEWAY,
            Json(serde_json::json!({
                "error": "backend_error",
                "message": e.to_string(),
                "items": ws.directory.users(),
                "notices": ws.notices.drain(),
            })),
        )
            .into_response(),
        Err(e) => errors::portal_error_to_response(e, ws.notices.drain()),
    }
}
