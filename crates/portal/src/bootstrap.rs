//! Seeding the first administrator.
//!
//! The existence check and the sign-up are two separate calls, so two
//! concurrent bootstraps can both see "no admin" and both create one. This is
//! accepted: bootstrap runs once, by hand, on an empty project.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};

use aluguetudo_auth::{Role, UserStatus};
use aluguetudo_core::UserId;
use aluguetudo_gateway::{Backend, BackendClient, ProfileMetadata, SignUpRequest, UserRow};

use crate::PortalError;
use crate::notify::{Notice, NoticeSink};

const ADMIN_NAME: &str = "Administrador";

#[derive(Debug)]
pub struct BootstrapCredentials {
    pub email: String,
    pub password: SecretString,
}

impl Clone for BootstrapCredentials {
    fn clone(&self) -> Self {
        Self {
            email: self.email.clone(),
            password: SecretString::from(self.password.expose_secret().to_string()),
        }
    }
}

impl BootstrapCredentials {
    fn matches(&self, email: &str, password: &str) -> bool {
        self.email.eq_ignore_ascii_case(email.trim()) && self.password.expose_secret() == password
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    AlreadyExists,
    Created(UserId),
}

pub struct AdminBootstrap {
    backend: Arc<dyn Backend>,
    credentials: BootstrapCredentials,
    notices: Arc<dyn NoticeSink>,
}

impl AdminBootstrap {
    pub fn new(
        backend: Arc<dyn Backend>,
        credentials: BootstrapCredentials,
        notices: Arc<dyn NoticeSink>,
    ) -> Self {
        Self {
            backend,
            credentials,
            notices,
        }
    }

    /// Create the administrator account unless one already exists.
    ///
    /// Runs on its own anonymous client so no caller session is touched.
    #[tracing::instrument(skip_all, fields(email = %email))]
    pub async fn bootstrap_admin(&self, email: &str, password: &str) -> Result<BootstrapOutcome, PortalError> {
        if !self.credentials.matches(email, password) {
            self.notices
                .notify(Notice::error("Credenciais de administrador inválidas"));
            return Err(PortalError::InvalidBootstrapCredentials);
        }

        let client = BackendClient::new(self.backend.clone());

        let admins = match client.select_admins(1).await {
            Ok(rows) => rows,
            Err(e) => {
                self.notices
                    .notify(Notice::error("Erro ao verificar administradores existentes"));
                return Err(e.into());
            }
        };
        if !admins.is_empty() {
            self.notices
                .notify(Notice::warning("Já existe pelo menos um administrador no sistema"));
            return Ok(BootstrapOutcome::AlreadyExists);
        }

        let email = self.credentials.email.to_lowercase();
        let request = SignUpRequest {
            email: email.clone(),
            password: SecretString::from(password.to_string()),
            metadata: ProfileMetadata {
                name: Some(ADMIN_NAME.to_string()),
                role: vec![Role::admin()],
                status: Some(UserStatus::Active),
            },
            email_redirect_to: None,
        };

        let response = match client.sign_up(&request).await {
            Ok(r) => r,
            Err(e) => {
                self.notices
                    .notify(Notice::error(format!("Erro ao criar admin: {e}")));
                return Err(e.into());
            }
        };

        let Some(user_id) = response
            .user
            .as_ref()
            .map(|u| u.id)
            .or_else(|| response.session.as_ref().map(|s| s.user_id))
        else {
            self.notices
                .notify(Notice::error("Falha ao criar admin: resposta incompleta"));
            return Err(aluguetudo_gateway::GatewayError::Decode(
                "sign-up returned no user".to_string(),
            )
            .into());
        };

        let row = UserRow {
            id: user_id,
            name: ADMIN_NAME.to_string(),
            email,
            role: vec![Role::admin()],
            status: UserStatus::Active,
            created_at: None,
        };
        if let Err(e) = client.insert_user_row(&row).await {
            tracing::warn!(user_id = %user_id, error = %e, "admin profile insert failed");
        }

        if let Err(e) = client.sign_out().await {
            tracing::warn!(error = %e, "could not close bootstrap session");
        }

        tracing::info!(user_id = %user_id, "administrator bootstrapped");
        self.notices.notify(Notice::success("Administrador criado com sucesso!"));
        Ok(BootstrapOutcome::Created(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use aluguetudo_gateway::{InMemoryBackend, Op};

    use crate::notify::{NoticeLevel, NoticeLog};

    fn bootstrap(backend: &Arc<InMemoryBackend>) -> (AdminBootstrap, Arc<NoticeLog>) {
        let notices = Arc::new(NoticeLog::new());
        let b = AdminBootstrap::new(
            backend.clone(),
            BootstrapCredentials {
                email: "admin@aluguetudo.com".to_string(),
                password: SecretString::from("admin123".to_string()),
            },
            notices.clone(),
        );
        (b, notices)
    }

    #[tokio::test]
    async fn creates_admin_with_profile_row_on_empty_backend() {
        let backend = Arc::new(InMemoryBackend::new());
        let (b, notices) = bootstrap(&backend);

        let outcome = b.bootstrap_admin("admin@aluguetudo.com", "admin123").await.unwrap();

        let BootstrapOutcome::Created(id) = outcome else {
            panic!("expected Created");
        };
        assert!(backend.row(id).unwrap().is_admin());
        assert_eq!(backend.call_count(Op::SignOut), 1);
        assert!(notices.has(NoticeLevel::Success));
    }

    #[tokio::test]
    async fn second_bootstrap_reports_existing_admin() {
        let backend = Arc::new(InMemoryBackend::new());
        let (b, notices) = bootstrap(&backend);
        b.bootstrap_admin("admin@aluguetudo.com", "admin123").await.unwrap();

        let outcome = b.bootstrap_admin("admin@aluguetudo.com", "admin123").await.unwrap();

        assert_eq!(outcome, BootstrapOutcome::AlreadyExists);
        assert_eq!(backend.call_count(Op::SignUp), 1);
        assert!(notices.has(NoticeLevel::Warning));
    }

    #[tokio::test]
    async fn wrong_credentials_make_no_backend_call() {
        let backend = Arc::new(InMemoryBackend::new());
        let (b, _) = bootstrap(&backend);

        let err = b.bootstrap_admin("admin@aluguetudo.com", "errada").await.unwrap_err();

        assert!(matches!(err, PortalError::InvalidBootstrapCredentials));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn profile_insert_failure_is_not_fatal() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.fail(Op::InsertUserRow);
        let (b, _) = bootstrap(&backend);

        let outcome = b.bootstrap_admin("admin@aluguetudo.com", "admin123").await.unwrap();

        assert!(matches!(outcome, BootstrapOutcome::Created(_)));
        assert!(backend.account_exists("admin@aluguetudo.com"));
    }
}
