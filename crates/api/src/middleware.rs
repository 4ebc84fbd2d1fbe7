use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use aluguetudo_auth::JwtValidator;

use crate::app::errors::json_error;
use crate::app::services::AppServices;
use crate::context::{PrincipalContext, SessionContext};

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
    pub services: Arc<AppServices>,
}

/// Require a valid bearer token whose server-side session is still live.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let token = extract_bearer(req.headers())
        .ok_or_else(|| json_error(StatusCode::UNAUTHORIZED, "unauthenticated", "missing bearer token"))?
        .to_string();

    let now = Utc::now();
    let claims = state
        .jwt
        .validate(&token, now)
        .map_err(|e| json_error(StatusCode::UNAUTHORIZED, "invalid_token", e.to_string()))?;

    let entry = state
        .services
        .authenticate(&token, claims.sub, now)
        .map_err(|e| json_error(StatusCode::UNAUTHORIZED, "session_expired", e.to_string()))?;

    req.extensions_mut()
        .insert(PrincipalContext::new(entry.principal));
    req.extensions_mut()
        .insert(SessionContext::new(token, entry.session));

    Ok(next.run(req).await)
}

/// `Authorization: Bearer <token>`, if present and non-empty.
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let header = header.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_is_extracted() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer(&headers), None);

        headers.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(extract_bearer(&headers), Some("abc"));

        headers.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_bearer(&headers), None);

        headers.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert_eq!(extract_bearer(&headers), None);
    }
}
