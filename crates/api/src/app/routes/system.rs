use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use crate::context::{PrincipalContext, SessionContext};

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(
    Extension(principal): Extension<PrincipalContext>,
    Extension(session): Extension<SessionContext>,
) -> impl IntoResponse {
    let p = principal.principal();
    Json(serde_json::json!({
        "id": p.id.to_string(),
        "name": p.display_name,
        "email": p.email,
        "roles": principal.roles().iter().map(|r| r.as_str()).collect::<Vec<_>>(),
        "status": p.status,
        "is_admin": p.is_admin(),
        "session_expires_at": session.session().expires_at,
    }))
}
