use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Query},
    http::HeaderMap,
    response::IntoResponse,
};
use chrono::Utc;

use aluguetudo_auth::{HOME_PATH, JwtValidator, navigation as nav, resolve};

use crate::app::dto;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;
use crate::middleware::extract_bearer;

/// Menu sections visible to the caller.
pub async fn navigation(Extension(principal): Extension<PrincipalContext>) -> impl IntoResponse {
    Json(serde_json::json!({ "sections": nav(principal.principal()) }))
}

/// What the portal does when the caller opens `path`.
///
/// Works with or without a token: no token resolves as an anonymous session,
/// a token whose session is gone resolves as expired.
pub async fn resolve_route(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(jwt): Extension<Arc<dyn JwtValidator>>,
    headers: HeaderMap,
    Query(query): Query<dto::ResolveQuery>,
) -> impl IntoResponse {
    let state = services.session_state(extract_bearer(&headers), jwt.as_ref(), Utc::now());
    let path = query.path.as_deref().unwrap_or(HOME_PATH);
    Json(resolve(&state, path))
}
