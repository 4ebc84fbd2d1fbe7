//! Session-holding backend client.
//!
//! Mirrors how the platform's browser SDK behaves: the client keeps one
//! "current" session, uses it for every authenticated call, and *replaces*
//! it with whatever session a sign-up returns. That last behavior is why
//! provisioning has to capture and restore credentials around sign-up.

use std::sync::{Arc, RwLock};

use aluguetudo_auth::Session;
use aluguetudo_core::UserId;

use crate::model::{AuthUser, NewAuthUser, ProfileUpdate, SignUpRequest, SignUpResponse, UserRow};
use crate::{Backend, GatewayError};

#[derive(Clone)]
pub struct BackendClient {
    backend: Arc<dyn Backend>,
    session: Arc<RwLock<Option<Session>>>,
}

impl core::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BackendClient")
            .field("session", &self.current_session())
            .finish_non_exhaustive()
    }
}

impl BackendClient {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            session: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_session(backend: Arc<dyn Backend>, session: Session) -> Self {
        Self {
            backend,
            session: Arc::new(RwLock::new(Some(session))),
        }
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Snapshot of the held session.
    pub fn current_session(&self) -> Option<Session> {
        match self.session.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn install(&self, session: Option<Session>) {
        match self.session.write() {
            Ok(mut guard) => *guard = session,
            Err(poisoned) => *poisoned.into_inner() = session,
        }
    }

    fn require_session(&self) -> Result<Session, GatewayError> {
        self.current_session().ok_or(GatewayError::NoSession)
    }

    pub fn clear_session(&self) {
        self.install(None);
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, GatewayError> {
        let session = self.backend.sign_in_with_password(email, password).await?;
        self.install(Some(session.clone()));
        Ok(session)
    }

    /// Sign the held session out. The local session is dropped even when the
    /// backend call fails.
    pub async fn sign_out(&self) -> Result<(), GatewayError> {
        let Some(session) = self.current_session() else {
            return Ok(());
        };
        self.clear_session();
        self.backend.sign_out(&session).await
    }

    /// Re-install previously captured credentials.
    ///
    /// The captured refresh token is exchanged for a fresh session so a
    /// stale access token is never put back in place.
    pub async fn set_session(&self, captured: &Session) -> Result<Session, GatewayError> {
        let refreshed = self.backend.refresh_session(&captured.refresh_token).await?;
        if refreshed.user_id != captured.user_id {
            return Err(GatewayError::Unauthorized(
                "refreshed session belongs to a different user".to_string(),
            ));
        }
        self.install(Some(refreshed.clone()));
        Ok(refreshed)
    }

    /// Call the sign-up primitive.
    ///
    /// If the platform returns a session, it *replaces* the held one.
    pub async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpResponse, GatewayError> {
        let response = self.backend.sign_up(request).await?;
        if let Some(new_session) = &response.session {
            tracing::warn!(
                new_user_id = %new_session.user_id,
                "sign-up replaced the client session"
            );
            self.install(Some(new_session.clone()));
        }
        Ok(response)
    }

    pub async fn get_user(&self) -> Result<AuthUser, GatewayError> {
        let session = self.require_session()?;
        self.backend.get_user(&session.access_token).await
    }

    pub async fn insert_user_row(&self, row: &UserRow) -> Result<(), GatewayError> {
        let session = self.current_session();
        self.backend.insert_user_row(session.as_ref(), row).await
    }

    pub async fn select_admins(&self, limit: usize) -> Result<Vec<UserRow>, GatewayError> {
        let session = self.current_session();
        self.backend.select_admins(session.as_ref(), limit).await
    }

    pub async fn get_user_row(&self, id: UserId) -> Result<Option<UserRow>, GatewayError> {
        let session = self.require_session()?;
        self.backend.get_user_row(&session, id).await
    }

    pub async fn get_all_users(&self) -> Result<Vec<UserRow>, GatewayError> {
        let session = self.require_session()?;
        self.backend.get_all_users(&session).await
    }

    pub async fn create_new_auth_user(&self, args: &NewAuthUser) -> Result<Option<UserId>, GatewayError> {
        let session = self.require_session()?;
        self.backend.create_new_auth_user(&session, args).await
    }

    pub async fn create_user_profile(&self, row: &UserRow) -> Result<(), GatewayError> {
        let session = self.require_session()?;
        self.backend.create_user_profile(&session, row).await
    }

    pub async fn update_user(&self, update: &ProfileUpdate) -> Result<(), GatewayError> {
        let session = self.require_session()?;
        self.backend.update_user(&session, update).await
    }

    pub async fn update_user_password(&self, user_id: UserId, new_password: &str) -> Result<(), GatewayError> {
        let session = self.require_session()?;
        self.backend
            .update_user_password(&session, user_id, new_password)
            .await
    }

    pub async fn delete_user(&self, user_id: UserId) -> Result<(), GatewayError> {
        let session = self.require_session()?;
        self.backend.delete_user(&session, user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryBackend, Op};
    use crate::model::ProfileMetadata;
    use aluguetudo_auth::Role;
    use secrecy::SecretString;

    fn signup(email: &str) -> SignUpRequest {
        SignUpRequest {
            email: email.to_string(),
            password: SecretString::from("pw-123456".to_string()),
            metadata: ProfileMetadata {
                name: Some("Nova".to_string()),
                role: vec![Role::new("rh")],
                status: None,
            },
            email_redirect_to: None,
        }
    }

    #[tokio::test]
    async fn sign_up_replaces_the_held_session() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.seed_user("admin@aluguetudo.com", "admin123", "Admin", &["admin"]);
        let client = BackendClient::new(backend.clone());

        let admin = client.sign_in("admin@aluguetudo.com", "admin123").await.unwrap();
        let response = client.sign_up(&signup("nova@aluguetudo.com")).await.unwrap();

        let held = client.current_session().unwrap();
        assert_ne!(held.user_id, admin.user_id);
        assert_eq!(Some(held.user_id), response.user.map(|u| u.id));
    }

    #[tokio::test]
    async fn set_session_restores_captured_identity() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.seed_user("admin@aluguetudo.com", "admin123", "Admin", &["admin"]);
        let client = BackendClient::new(backend.clone());

        let captured = client.sign_in("admin@aluguetudo.com", "admin123").await.unwrap();
        client.sign_up(&signup("nova@aluguetudo.com")).await.unwrap();

        let restored = client.set_session(&captured).await.unwrap();
        assert_eq!(restored.user_id, captured.user_id);
        assert_eq!(client.current_session().unwrap().user_id, captured.user_id);
        assert_eq!(backend.call_count(Op::RefreshSession), 1);
    }

    #[tokio::test]
    async fn authenticated_calls_without_session_fail_locally() {
        let backend = Arc::new(InMemoryBackend::new());
        let client = BackendClient::new(backend.clone());

        assert!(matches!(client.get_all_users().await, Err(GatewayError::NoSession)));
        assert_eq!(backend.call_count(Op::GetAllUsers), 0);
    }

    #[tokio::test]
    async fn sign_out_clears_even_when_backend_fails() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.seed_user("a@aluguetudo.com", "pw", "A", &["rh"]);
        let client = BackendClient::new(backend.clone());
        client.sign_in("a@aluguetudo.com", "pw").await.unwrap();

        backend.fail(Op::SignOut);
        assert!(client.sign_out().await.is_err());
        assert!(client.current_session().is_none());
    }
}
