//! Application services shared by every handler.
//!
//! The API is a backend-for-frontend: it signs callers in against the backend
//! platform, keeps their backend session server-side (keyed by the bearer
//! token it hands out) and runs the portal workflows on their behalf.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use chrono::{DateTime, Utc};
use thiserror::Error;

use aluguetudo_auth::{Hs256JwtIssuer, JwtValidator, Principal, Session, SessionState, TokenValidationError};
use aluguetudo_core::UserId;
use aluguetudo_gateway::{Backend, BackendClient};
use aluguetudo_portal::{
    AdminBootstrap, BootstrapCredentials, BootstrapOutcome, NoticeLog, NoticeSink, PortalError, Provisioner,
    ProvisioningConfig, SessionHolder, TaskBoards, UserDirectory,
};

use crate::context::{PrincipalContext, SessionContext};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Portal(#[from] PortalError),

    #[error("failed to issue token: {0}")]
    TokenIssue(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Session registry
// ─────────────────────────────────────────────────────────────────────────────

/// What the API remembers about a signed-in caller.
#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub principal: Principal,
    pub session: Session,
}

/// Bearer token → backend session.
///
/// A token is only honored while its entry exists; sign-out and expiry
/// remove it.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    inner: RwLock<HashMap<String, SessionEntry>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, token: String, entry: SessionEntry) {
        self.inner
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .insert(token, entry);
    }

    pub fn get(&self, token: &str) -> Option<SessionEntry> {
        self.inner
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(token)
            .cloned()
    }

    pub fn remove(&self, token: &str) -> Option<SessionEntry> {
        self.inner
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .remove(token)
    }

    /// Replace the backend session behind `token` (e.g. after a refresh).
    pub fn update_session(&self, token: &str, session: Session) {
        if let Some(entry) = self
            .inner
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .get_mut(token)
        {
            entry.session = session;
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Services
// ─────────────────────────────────────────────────────────────────────────────

/// A freshly issued bearer token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub principal: Principal,
}

/// Portal workflows bound to one request's caller.
pub struct Workspace {
    pub session: SessionHolder,
    pub directory: UserDirectory,
    pub provisioner: Provisioner,
    pub notices: Arc<NoticeLog>,
}

pub struct AppServices {
    backend: Arc<dyn Backend>,
    issuer: Hs256JwtIssuer,
    provisioning: ProvisioningConfig,
    bootstrap: BootstrapCredentials,
    pub sessions: SessionRegistry,
    pub tasks: TaskBoards,
}

impl AppServices {
    pub fn new(
        backend: Arc<dyn Backend>,
        issuer: Hs256JwtIssuer,
        provisioning: ProvisioningConfig,
        bootstrap: BootstrapCredentials,
    ) -> Self {
        Self {
            backend,
            issuer,
            provisioning,
            bootstrap,
            sessions: SessionRegistry::new(),
            tasks: TaskBoards::new(),
        }
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Sign in against the backend and hand out a bearer token for the session.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        notices: Arc<dyn NoticeSink>,
    ) -> Result<IssuedToken, ServiceError> {
        let mut holder = SessionHolder::new(BackendClient::new(self.backend.clone()), notices);
        let principal = holder.sign_in(email, password).await?;
        let session = holder
            .client()
            .current_session()
            .ok_or(PortalError::NotAuthenticated)?;

        let (token, claims) = self
            .issuer
            .issue(principal.id, principal.roles.as_slice().to_vec(), Utc::now())
            .map_err(|e| ServiceError::TokenIssue(e.to_string()))?;

        self.sessions.insert(
            token.clone(),
            SessionEntry {
                principal: principal.clone(),
                session,
            },
        );

        Ok(IssuedToken {
            token,
            expires_at: claims.expires_at,
            principal,
        })
    }

    /// Check that `token` still has a live backend session for `sub`.
    ///
    /// Stale entries are dropped, so a token fails the same way every time
    /// after its session is gone.
    pub fn authenticate(&self, token: &str, sub: UserId, now: DateTime<Utc>) -> Result<SessionEntry, PortalError> {
        let entry = self.sessions.get(token).ok_or(PortalError::SessionExpired)?;
        if entry.principal.id != sub {
            return Err(PortalError::NotAuthenticated);
        }

        let client = BackendClient::with_session(self.backend.clone(), entry.session.clone());
        let mut holder = SessionHolder::resume(client, entry.principal.clone(), Arc::new(NoticeLog::new()));
        if let Err(e) = holder.ensure_authenticated(now) {
            tracing::info!(user_id = %sub, "backend session lapsed; dropping token");
            self.sessions.remove(token);
            return Err(e);
        }

        Ok(entry)
    }

    /// Session state as seen by an optional bearer token (for route resolution).
    pub fn session_state(&self, token: Option<&str>, jwt: &dyn JwtValidator, now: DateTime<Utc>) -> SessionState {
        let Some(token) = token else {
            return SessionState::Anonymous;
        };

        match jwt.validate(token, now) {
            Ok(claims) => match self.authenticate(token, claims.sub, now) {
                Ok(entry) => SessionState::Authenticated(entry.principal),
                Err(_) => SessionState::Expired,
            },
            Err(TokenValidationError::Expired) => SessionState::Expired,
            Err(_) => SessionState::Anonymous,
        }
    }

    pub async fn logout(&self, ctx: &SessionContext, principal: &PrincipalContext) {
        let mut workspace = self.workspace(ctx, principal);
        workspace.session.sign_out().await;
        self.sessions.remove(ctx.token());
        tracing::info!(user_id = %principal.principal_id(), "signed out");
    }

    /// Build the portal workflows for the caller behind `ctx`.
    ///
    /// Session holder and directory share one client, so a session change made
    /// by provisioning is visible to the directory re-fetch.
    pub fn workspace(&self, ctx: &SessionContext, principal: &PrincipalContext) -> Workspace {
        let notices = Arc::new(NoticeLog::new());
        let client = BackendClient::with_session(self.backend.clone(), ctx.session().clone());

        Workspace {
            session: SessionHolder::resume(client.clone(), principal.principal().clone(), notices.clone()),
            directory: UserDirectory::new(client, notices.clone()),
            provisioner: Provisioner::new(self.provisioning.clone(), notices.clone()),
            notices,
        }
    }

    /// Carry session changes made during a workflow back into the registry.
    pub fn sync_session(&self, ctx: &SessionContext, workspace: &Workspace) {
        let current = workspace.session.client().current_session();
        match (workspace.session.state(), current) {
            (SessionState::Authenticated(_), Some(session)) => {
                if &session != ctx.session() {
                    self.sessions.update_session(ctx.token(), session);
                }
            }
            _ => {
                self.sessions.remove(ctx.token());
            }
        }
    }

    pub async fn bootstrap_admin(
        &self,
        email: &str,
        password: &str,
        notices: Arc<dyn NoticeSink>,
    ) -> Result<BootstrapOutcome, PortalError> {
        AdminBootstrap::new(self.backend.clone(), self.bootstrap.clone(), notices)
            .bootstrap_admin(email, password)
            .await
    }
}
