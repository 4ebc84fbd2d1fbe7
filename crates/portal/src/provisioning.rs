//! Creating managed accounts on behalf of a signed-in administrator.
//!
//! The default path is the privileged `create_new_auth_user` procedure: it
//! creates identity and profile server-side, is idempotent by email, and
//! leaves the caller's session alone.
//!
//! The sign-up path is kept for backends without that procedure. Sign-up
//! replaces the client's session with the new account's, so the admin's
//! credentials are captured beforehand and restored right after. When that
//! restore fails the admin has to sign in again.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use aluguetudo_auth::{LOGIN_PATH, NewAccount, UserDraft};
use aluguetudo_core::UserId;
use aluguetudo_gateway::{GatewayError, NewAuthUser, ProfileMetadata, SignUpRequest, UserRow};

use crate::PortalError;
use crate::directory::UserDirectory;
use crate::notify::{Notice, NoticeSink};
use crate::session::SessionHolder;

#[derive(Debug, Clone)]
pub struct ProvisioningConfig {
    /// Fall back to sign-up + session restore when the procedure fails.
    pub signup_fallback: bool,
    /// How long a client should wait before following a re-login redirect.
    pub redirect_delay: Duration,
    /// Confirmation link target passed to sign-up.
    pub email_redirect_to: Option<String>,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            signup_fallback: false,
            redirect_delay: Duration::from_millis(2000),
            email_redirect_to: None,
        }
    }
}

/// Which path created the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionPath {
    ServerProcedure,
    SignUpFallback,
}

impl ProvisionPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisionPath::ServerProcedure => "server_procedure",
            ProvisionPath::SignUpFallback => "signup_fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    Created { user_id: UserId, via: ProvisionPath },
    /// Identity exists but no profile row could be written.
    ProfileIncomplete { user_id: UserId },
    /// The admin's session was lost; the client should go to `redirect`
    /// after `after`.
    ReauthenticationRequired { redirect: String, after: Duration },
}

pub struct Provisioner {
    config: ProvisioningConfig,
    notices: Arc<dyn NoticeSink>,
}

impl core::fmt::Debug for Provisioner {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Provisioner")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Provisioner {
    pub fn new(config: ProvisioningConfig, notices: Arc<dyn NoticeSink>) -> Self {
        Self { config, notices }
    }

    pub fn config(&self) -> &ProvisioningConfig {
        &self.config
    }

    /// Create the account described by `draft`.
    ///
    /// Input is validated before any backend call. On success the directory
    /// is re-fetched.
    #[tracing::instrument(skip_all, fields(email = %draft.email))]
    pub async fn provision(
        &self,
        session: &mut SessionHolder,
        directory: &mut UserDirectory,
        draft: &UserDraft,
    ) -> Result<ProvisionOutcome, PortalError> {
        let account = match draft.validate_new() {
            Ok(a) => a,
            Err(e) => {
                self.notices.notify(Notice::error(e.to_string()));
                return Err(e.into());
            }
        };

        let procedure_error = match self.via_procedure(session, &account).await {
            Ok(user_id) => {
                tracing::info!(user_id = %user_id, "account created by server procedure");
                self.notices.notify(Notice::success("Usuário adicionado com sucesso!"));
                directory.refresh().await;
                return Ok(ProvisionOutcome::Created {
                    user_id,
                    via: ProvisionPath::ServerProcedure,
                });
            }
            Err(e) => e,
        };

        if !self.config.signup_fallback {
            self.notices.notify(Notice::error(format!(
                "Erro ao criar usuário: {procedure_error}"
            )));
            return Err(procedure_error.into());
        }

        tracing::warn!(error = %procedure_error, "server procedure failed; falling back to sign-up");
        self.via_signup(session, directory, &account).await
    }

    async fn via_procedure(
        &self,
        session: &SessionHolder,
        account: &NewAccount,
    ) -> Result<UserId, GatewayError> {
        let args = NewAuthUser {
            email: account.email.clone(),
            password: SecretString::from(account.password().to_string()),
            name: account.name.clone(),
            role: account.roles.as_slice().to_vec(),
            status: account.status,
        };

        session
            .client()
            .create_new_auth_user(&args)
            .await?
            .ok_or_else(|| GatewayError::Decode("create_new_auth_user returned no id".to_string()))
    }

    async fn via_signup(
        &self,
        session: &mut SessionHolder,
        directory: &mut UserDirectory,
        account: &NewAccount,
    ) -> Result<ProvisionOutcome, PortalError> {
        let client = session.client().clone();
        let captured = client.current_session();

        let request = SignUpRequest {
            email: account.email.clone(),
            password: SecretString::from(account.password().to_string()),
            metadata: ProfileMetadata {
                name: Some(account.name.clone()),
                role: account.roles.as_slice().to_vec(),
                status: Some(account.status),
            },
            email_redirect_to: self.config.email_redirect_to.clone(),
        };

        let signed_up = client.sign_up(&request).await;

        // Whatever sign-up did to the client session, put the admin's back.
        let restored = match &captured {
            Some(c) => match client.set_session(c).await {
                Ok(_) => true,
                Err(e) => {
                    tracing::error!(error = %e, "could not restore admin session after sign-up");
                    false
                }
            },
            None => false,
        };

        let response = match signed_up {
            Ok(r) => r,
            Err(e) => {
                if !restored {
                    return Ok(self.require_reauthentication(session));
                }
                self.notices
                    .notify(Notice::error(format!("Erro ao criar usuário: {e}")));
                return Err(e.into());
            }
        };

        if !restored {
            return Ok(self.require_reauthentication(session));
        }

        let user_id = match response
            .user
            .as_ref()
            .map(|u| u.id)
            .or_else(|| response.session.as_ref().map(|s| s.user_id))
        {
            Some(id) => id,
            None => {
                self.notices.notify(Notice::error(
                    "Erro ao criar perfil de usuário: dados incompletos",
                ));
                return Err(GatewayError::Decode("sign-up returned no user".to_string()).into());
            }
        };

        let row = UserRow {
            id: user_id,
            name: account.name.clone(),
            email: account.email.clone(),
            role: account.roles.as_slice().to_vec(),
            status: account.status,
            created_at: None,
        };

        if self.write_profile(session, &row).await {
            tracing::info!(user_id = %user_id, "account created by sign-up fallback");
            self.notices.notify(Notice::success("Usuário adicionado com sucesso!"));
            directory.refresh().await;
            Ok(ProvisionOutcome::Created {
                user_id,
                via: ProvisionPath::SignUpFallback,
            })
        } else {
            self.notices.notify(Notice::error(
                "Usuário foi criado, mas o perfil pode não estar completo.",
            ));
            Ok(ProvisionOutcome::ProfileIncomplete { user_id })
        }
    }

    /// Direct insert first, then the profile procedure.
    async fn write_profile(&self, session: &SessionHolder, row: &UserRow) -> bool {
        let client = session.client();

        match client.insert_user_row(row).await {
            Ok(()) => return true,
            Err(e) => tracing::warn!(user_id = %row.id, error = %e, "direct profile insert failed"),
        }

        match client.create_user_profile(row).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(user_id = %row.id, error = %e, "profile procedure failed");
                false
            }
        }
    }

    fn require_reauthentication(&self, session: &mut SessionHolder) -> ProvisionOutcome {
        session.expire();
        self.notices.notify(Notice::error(
            "Sua sessão expirou durante a criação do usuário. Por favor, faça login novamente.",
        ));
        ProvisionOutcome::ReauthenticationRequired {
            redirect: LOGIN_PATH.to_string(),
            after: self.config.redirect_delay,
        }
    }
}
