//! REST implementation of [`Backend`] for the hosted platform.
//!
//! Endpoints follow the platform's conventions:
//! - auth under `/auth/v1` (`token`, `logout`, `user`, `signup`)
//! - tables under `/rest/v1/{table}` with PostgREST filters
//! - procedures under `/rest/v1/rpc/{name}`
//!
//! Every request carries the public `apikey` header; authenticated requests
//! add the session's access token as bearer credentials, anonymous ones use
//! the public key instead.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use aluguetudo_auth::Session;
use aluguetudo_core::UserId;

use crate::model::{AuthUser, NewAuthUser, ProfileUpdate, SignUpRequest, SignUpResponse, UserRow};
use crate::{Backend, GatewayError};

const USERS_TABLE: &str = "users";

#[derive(Debug)]
pub struct HttpBackendConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`.
    pub base_url: String,
    /// Public (anon) API key.
    pub anon_key: SecretString,
}

/// Backend client over the platform's REST API.
#[derive(Clone)]
pub struct HttpBackend {
    inner: Arc<HttpBackendInner>,
}

struct HttpBackendInner {
    client: reqwest::Client,
    base_url: String,
    anon_key: SecretString,
}

/// Token grant response from `/auth/v1/token` and auto-confirmed sign-ups.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    user: AuthUser,
}

impl TokenResponse {
    fn into_session(self) -> (Session, AuthUser) {
        let session = Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: Utc::now() + Duration::seconds(self.expires_in),
            user_id: self.user.id,
        };
        (session, self.user)
    }
}

impl HttpBackend {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns error if the API key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: HttpBackendConfig) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(config.anon_key.expose_secret())
                .map_err(|e| GatewayError::Decode(format!("invalid API key format: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            inner: Arc::new(HttpBackendInner {
                client,
                base_url: config.base_url.trim_end_matches('/').to_string(),
                anon_key: config.anon_key,
            }),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.inner.base_url, path)
    }

    /// Attach bearer credentials: the session's token, or the public key.
    fn authorize(&self, req: RequestBuilder, session: Option<&Session>) -> RequestBuilder {
        match session {
            Some(s) => req.bearer_auth(&s.access_token),
            None => req.bearer_auth(self.inner.anon_key.expose_secret()),
        }
    }

    async fn rpc<T: DeserializeOwned>(
        &self,
        name: &str,
        session: &Session,
        args: Value,
    ) -> Result<T, GatewayError> {
        tracing::debug!(procedure = name, "calling backend procedure");
        let req = self
            .inner
            .client
            .post(self.url(&format!("/rest/v1/rpc/{name}")))
            .json(&args);
        let response = self.authorize(req, Some(session)).send().await?;
        Self::decode(response).await
    }

    async fn rpc_unit(&self, name: &str, session: &Session, args: Value) -> Result<(), GatewayError> {
        tracing::debug!(procedure = name, "calling backend procedure");
        let req = self
            .inner
            .client
            .post(self.url(&format!("/rest/v1/rpc/{name}")))
            .json(&args);
        let response = self.authorize(req, Some(session)).send().await?;
        Self::check(response).await.map(|_| ())
    }

    async fn check(response: Response) -> Result<Response, GatewayError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body).unwrap_or_else(|| status.to_string());

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::Unauthorized(message),
            StatusCode::NOT_FOUND => GatewayError::NotFound(message),
            StatusCode::SERVICE_UNAVAILABLE => GatewayError::Unavailable(message),
            _ => GatewayError::api(status.as_u16(), message),
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
        let response = Self::check(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

/// Pull a human-readable message out of an error body.
///
/// The auth service and the REST layer use different field names.
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["message", "msg", "error_description", "error"]
        .iter()
        .find_map(|k| value.get(*k).and_then(Value::as_str))
        .map(str::to_string)
}

#[async_trait]
impl Backend for HttpBackend {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, GatewayError> {
        let response = self
            .inner
            .client
            .post(self.url("/auth/v1/token?grant_type=password"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let token: TokenResponse = Self::decode(response).await?;
        Ok(token.into_session().0)
    }

    async fn sign_out(&self, session: &Session) -> Result<(), GatewayError> {
        let req = self.inner.client.post(self.url("/auth/v1/logout"));
        let response = self.authorize(req, Some(session)).send().await?;
        Self::check(response).await.map(|_| ())
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, GatewayError> {
        let response = self
            .inner
            .client
            .get(self.url("/auth/v1/user"))
            .bearer_auth(access_token)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, GatewayError> {
        let response = self
            .inner
            .client
            .post(self.url("/auth/v1/token?grant_type=refresh_token"))
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;
        let token: TokenResponse = Self::decode(response).await?;
        Ok(token.into_session().0)
    }

    async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpResponse, GatewayError> {
        let mut req = self.inner.client.post(self.url("/auth/v1/signup"));
        if let Some(redirect) = &request.email_redirect_to {
            req = req.query(&[("redirect_to", redirect.as_str())]);
        }
        let response = req
            .json(&json!({
                "email": request.email,
                "password": request.password(),
                "data": request.metadata,
            }))
            .send()
            .await?;

        // Auto-confirmed projects answer with a token grant; otherwise the bare user.
        let body: Value = Self::decode(response).await?;
        if body.get("access_token").is_some() {
            let token: TokenResponse =
                serde_json::from_value(body).map_err(|e| GatewayError::Decode(e.to_string()))?;
            let (session, user) = token.into_session();
            return Ok(SignUpResponse {
                user: Some(user),
                session: Some(session),
            });
        }

        let user = serde_json::from_value::<AuthUser>(body).ok();
        Ok(SignUpResponse { user, session: None })
    }

    async fn insert_user_row(&self, session: Option<&Session>, row: &UserRow) -> Result<(), GatewayError> {
        let req = self
            .inner
            .client
            .post(self.url(&format!("/rest/v1/{USERS_TABLE}")))
            .header("Prefer", "return=minimal")
            .json(row);
        let response = self.authorize(req, session).send().await?;
        Self::check(response).await.map(|_| ())
    }

    async fn select_admins(&self, session: Option<&Session>, limit: usize) -> Result<Vec<UserRow>, GatewayError> {
        let req = self
            .inner
            .client
            .get(self.url(&format!("/rest/v1/{USERS_TABLE}")))
            .query(&[
                ("select", "*".to_string()),
                ("role", "cs.{admin}".to_string()),
                ("limit", limit.to_string()),
            ]);
        let response = self.authorize(req, session).send().await?;
        Self::decode(response).await
    }

    async fn get_user_row(&self, session: &Session, id: UserId) -> Result<Option<UserRow>, GatewayError> {
        let req = self
            .inner
            .client
            .get(self.url(&format!("/rest/v1/{USERS_TABLE}")))
            .query(&[("select", "*".to_string()), ("id", format!("eq.{id}"))]);
        let response = self.authorize(req, Some(session)).send().await?;
        let rows: Vec<UserRow> = Self::decode(response).await?;
        Ok(rows.into_iter().next())
    }

    async fn get_all_users(&self, session: &Session) -> Result<Vec<UserRow>, GatewayError> {
        self.rpc("get_all_users", session, json!({})).await
    }

    async fn create_new_auth_user(
        &self,
        session: &Session,
        args: &NewAuthUser,
    ) -> Result<Option<UserId>, GatewayError> {
        self.rpc(
            "create_new_auth_user",
            session,
            json!({
                "email": args.email,
                "password": args.password(),
                "name": args.name,
                "role": args.role,
                "status": args.status,
            }),
        )
        .await
    }

    async fn create_user_profile(&self, session: &Session, row: &UserRow) -> Result<(), GatewayError> {
        self.rpc_unit(
            "create_user_profile",
            session,
            json!({
                "user_id": row.id,
                "name": row.name,
                "email": row.email,
                "role": row.role,
                "status": row.status,
            }),
        )
        .await
    }

    async fn update_user(&self, session: &Session, update: &ProfileUpdate) -> Result<(), GatewayError> {
        self.rpc_unit(
            "update_user",
            session,
            json!({
                "user_id": update.user_id,
                "user_name": update.name,
                "user_email": update.email,
                "user_role": update.role,
                "user_status": update.status,
            }),
        )
        .await
    }

    async fn update_user_password(
        &self,
        session: &Session,
        user_id: UserId,
        new_password: &str,
    ) -> Result<(), GatewayError> {
        self.rpc_unit(
            "update_user_password",
            session,
            json!({ "user_id": user_id, "new_password": new_password }),
        )
        .await
    }

    async fn delete_user(&self, session: &Session, user_id: UserId) -> Result<(), GatewayError> {
        self.rpc_unit("delete_user", session, json!({ "user_id": user_id }))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_reads_auth_and_rest_shapes() {
        assert_eq!(
            error_message(r#"{"error_description":"Invalid login credentials"}"#).as_deref(),
            Some("Invalid login credentials")
        );
        assert_eq!(
            error_message(r#"{"code":"42501","message":"permission denied"}"#).as_deref(),
            Some("permission denied")
        );
        assert_eq!(error_message("<html>").as_deref(), None);
    }

    #[test]
    fn base_url_is_normalized() {
        let backend = HttpBackend::new(HttpBackendConfig {
            base_url: "https://project.example.co/".to_string(),
            anon_key: SecretString::from("anon".to_string()),
        })
        .unwrap();
        assert_eq!(backend.url("/auth/v1/user"), "https://project.example.co/auth/v1/user");
    }
}
