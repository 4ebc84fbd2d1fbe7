//! The portal's single source of truth for "who is signed in".
//!
//! State machine:
//! - `Anonymous` / `Expired` → `Authenticating` on `sign_in`
//! - `Authenticating` → `Authenticated(principal)` or back to `Anonymous`
//! - `Authenticated` → `Expired` once the backend session lapses (or provisioning
//!   loses it), → `Anonymous` on `sign_out`

use std::sync::Arc;

use chrono::{DateTime, Utc};

use aluguetudo_auth::{Principal, SessionState};
use aluguetudo_gateway::BackendClient;

use crate::PortalError;
use crate::notify::{Notice, NoticeSink};

pub struct SessionHolder {
    client: BackendClient,
    state: SessionState,
    notices: Arc<dyn NoticeSink>,
}

impl core::fmt::Debug for SessionHolder {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionHolder")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl SessionHolder {
    pub fn new(client: BackendClient, notices: Arc<dyn NoticeSink>) -> Self {
        Self {
            client,
            state: SessionState::Anonymous,
            notices,
        }
    }

    /// Resume an already established session (the client holds its credentials).
    pub fn resume(client: BackendClient, principal: Principal, notices: Arc<dyn NoticeSink>) -> Self {
        Self {
            client,
            state: SessionState::Authenticated(principal),
            notices,
        }
    }

    pub fn client(&self) -> &BackendClient {
        &self.client
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.state.principal()
    }

    pub fn notices(&self) -> &Arc<dyn NoticeSink> {
        &self.notices
    }

    #[tracing::instrument(skip_all, fields(email = %email))]
    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<Principal, PortalError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            self.notices
                .notify(Notice::error("Erro ao fazer login: informe e-mail e senha."));
            return Err(PortalError::MissingCredentials);
        }

        self.state = SessionState::Authenticating;

        match self.authenticate(email, password).await {
            Ok(principal) => {
                tracing::info!(user_id = %principal.id, roles = ?principal.roles, "signed in");
                self.state = SessionState::Authenticated(principal.clone());
                self.notices.notify(Notice::success("Login realizado com sucesso!"));
                Ok(principal)
            }
            Err(e) => {
                self.client.clear_session();
                self.state = SessionState::Anonymous;
                self.notices
                    .notify(Notice::error(format!("Erro ao fazer login: {e}")));
                Err(e)
            }
        }
    }

    /// Build the principal from the profile row, falling back to the auth
    /// identity's metadata when the row is missing or unusable.
    async fn authenticate(&self, email: &str, password: &str) -> Result<Principal, PortalError> {
        let session = self.client.sign_in(email, password).await?;

        match self.client.get_user_row(session.user_id).await {
            Ok(Some(row)) => match row.into_principal() {
                Ok(principal) => return Ok(principal),
                Err(e) => tracing::warn!(user_id = %session.user_id, error = %e, "unusable profile row"),
            },
            Ok(None) => tracing::warn!(user_id = %session.user_id, "no profile row; using auth metadata"),
            Err(e) => tracing::warn!(user_id = %session.user_id, error = %e, "profile lookup failed"),
        }

        let user = self.client.get_user().await?;
        Ok(user.to_principal()?)
    }

    /// Best-effort backend sign-out; local state always ends `Anonymous`.
    pub async fn sign_out(&mut self) {
        if let Err(e) = self.client.sign_out().await {
            tracing::warn!(error = %e, "backend sign-out failed");
        }
        self.state = SessionState::Anonymous;
    }

    /// Drop the held credentials and mark the session expired.
    pub fn expire(&mut self) {
        self.client.clear_session();
        self.state = SessionState::Expired;
    }

    /// Current principal, provided the backend session is still valid at `now`.
    pub fn ensure_authenticated(&mut self, now: DateTime<Utc>) -> Result<&Principal, PortalError> {
        match &self.state {
            SessionState::Authenticated(_) => {}
            SessionState::Expired => return Err(PortalError::SessionExpired),
            SessionState::Anonymous | SessionState::Authenticating => {
                return Err(PortalError::NotAuthenticated);
            }
        }

        let live = self
            .client
            .current_session()
            .is_some_and(|s| !s.is_expired(now));
        if !live {
            self.expire();
            return Err(PortalError::SessionExpired);
        }

        self.state.principal().ok_or(PortalError::NotAuthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use aluguetudo_gateway::{InMemoryBackend, Op};
    use chrono::Duration;

    use crate::notify::{NoticeLevel, NoticeLog};

    fn holder(backend: &Arc<InMemoryBackend>) -> (SessionHolder, Arc<NoticeLog>) {
        let notices = Arc::new(NoticeLog::new());
        let client = BackendClient::new(backend.clone());
        (SessionHolder::new(client, notices.clone()), notices)
    }

    #[tokio::test]
    async fn sign_in_builds_principal_from_profile_row() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.seed_user("rh@aluguetudo.com", "senha123", "Rita", &["rh"]);
        let (mut holder, notices) = holder(&backend);

        let p = holder.sign_in("rh@aluguetudo.com", "senha123").await.unwrap();

        assert_eq!(p.display_name, "Rita");
        assert!(p.has_role("rh"));
        assert!(holder.state().is_authenticated());
        assert!(notices.has(NoticeLevel::Success));
    }

    #[tokio::test]
    async fn empty_credentials_never_reach_the_backend() {
        let backend = Arc::new(InMemoryBackend::new());
        let (mut holder, notices) = holder(&backend);

        let err = holder.sign_in("  ", "x").await.unwrap_err();

        assert!(matches!(err, PortalError::MissingCredentials));
        assert!(backend.calls().is_empty());
        assert!(notices.has(NoticeLevel::Error));
        assert_eq!(holder.state(), &SessionState::Anonymous);
    }

    #[tokio::test]
    async fn unknown_email_returns_to_anonymous_with_error_notice() {
        let backend = Arc::new(InMemoryBackend::new());
        let (mut holder, notices) = holder(&backend);

        assert!(holder.sign_in("ninguem@aluguetudo.com", "whatever").await.is_err());

        assert_eq!(holder.state(), &SessionState::Anonymous);
        assert!(holder.client().current_session().is_none());
        assert!(notices.has(NoticeLevel::Error));
    }

    #[tokio::test]
    async fn profile_lookup_failure_falls_back_to_auth_metadata() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.seed_user("op@aluguetudo.com", "senha123", "Otávio", &["operacional"]);
        backend.fail(Op::GetUserRow);
        let (mut holder, _) = holder(&backend);

        let p = holder.sign_in("op@aluguetudo.com", "senha123").await.unwrap();
        assert!(p.has_role("operacional"));
    }

    #[tokio::test]
    async fn sign_out_is_local_even_when_backend_fails() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.seed_user("c@aluguetudo.com", "senha123", "Clara", &["comercial"]);
        let (mut holder, _) = holder(&backend);
        holder.sign_in("c@aluguetudo.com", "senha123").await.unwrap();

        backend.fail(Op::SignOut);
        holder.sign_out().await;

        assert_eq!(holder.state(), &SessionState::Anonymous);
        assert!(holder.client().current_session().is_none());
    }

    #[tokio::test]
    async fn lapsed_backend_session_moves_to_expired() {
        let backend = Arc::new(InMemoryBackend::with_session_ttl(Duration::minutes(5)));
        backend.seed_user("f@aluguetudo.com", "senha123", "Fábio", &["financeiro"]);
        let (mut holder, _) = holder(&backend);
        holder.sign_in("f@aluguetudo.com", "senha123").await.unwrap();

        assert!(holder.ensure_authenticated(Utc::now()).is_ok());

        let later = Utc::now() + Duration::minutes(10);
        assert!(matches!(
            holder.ensure_authenticated(later),
            Err(PortalError::SessionExpired)
        ));
        assert_eq!(holder.state(), &SessionState::Expired);
    }
}
