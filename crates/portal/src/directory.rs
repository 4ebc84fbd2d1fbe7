//! Administrative view over every profile.

use std::sync::Arc;

use aluguetudo_auth::{Principal, UserDraft};
use aluguetudo_core::UserId;
use aluguetudo_gateway::{BackendClient, ProfileUpdate};

use crate::PortalError;
use crate::notify::{Notice, NoticeSink};
use crate::provisioning::{ProvisionOutcome, Provisioner};
use crate::session::SessionHolder;

/// Result of [`UserDirectory::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Provisioned(ProvisionOutcome),
    Updated,
}

pub struct UserDirectory {
    client: BackendClient,
    users: Vec<Principal>,
    notices: Arc<dyn NoticeSink>,
}

impl core::fmt::Debug for UserDirectory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UserDirectory")
            .field("users", &self.users.len())
            .finish_non_exhaustive()
    }
}

impl UserDirectory {
    pub fn new(client: BackendClient, notices: Arc<dyn NoticeSink>) -> Self {
        Self {
            client,
            users: Vec::new(),
            notices,
        }
    }

    /// The locally held list, in backend order.
    pub fn users(&self) -> &[Principal] {
        &self.users
    }

    pub fn get(&self, id: UserId) -> Option<&Principal> {
        self.users.iter().find(|u| u.id == id)
    }

    /// Case-insensitive match on name or email; an empty query matches all.
    pub fn filtered(&self, query: &str) -> Vec<&Principal> {
        self.users.iter().filter(|u| u.matches_query(query)).collect()
    }

    /// Reload the whole list from the backend.
    pub async fn fetch(&mut self) -> Result<&[Principal], PortalError> {
        let rows = match self.client.get_all_users().await {
            Ok(rows) => rows,
            Err(e) => {
                self.notices
                    .notify(Notice::error(format!("Erro ao carregar usuários: {e}")));
                return Err(e.into());
            }
        };

        self.users = rows
            .into_iter()
            .filter_map(|row| {
                let id = row.id;
                match row.into_principal() {
                    Ok(p) => Some(p),
                    Err(e) => {
                        tracing::warn!(user_id = %id, error = %e, "skipping invalid profile row");
                        None
                    }
                }
            })
            .collect();

        tracing::debug!(count = self.users.len(), "user directory loaded");
        Ok(&self.users)
    }

    /// Create or update depending on whether the draft carries an id.
    pub async fn save(
        &mut self,
        draft: &UserDraft,
        provisioner: &Provisioner,
        session: &mut SessionHolder,
    ) -> Result<SaveOutcome, PortalError> {
        if draft.is_new() {
            let outcome = provisioner.provision(session, self, draft).await?;
            Ok(SaveOutcome::Provisioned(outcome))
        } else {
            self.update(draft).await?;
            Ok(SaveOutcome::Updated)
        }
    }

    /// Update profile fields and, when a password is supplied, the password.
    ///
    /// A failed password change is reported as a warning; the profile update
    /// still counts as successful.
    #[tracing::instrument(skip_all, fields(user_id = ?draft.id))]
    pub async fn update(&mut self, draft: &UserDraft) -> Result<(), PortalError> {
        let update = match draft.validate_update() {
            Ok(u) => u,
            Err(e) => {
                self.notices.notify(Notice::error(e.to_string()));
                return Err(e.into());
            }
        };

        let profile = ProfileUpdate {
            user_id: update.id,
            name: update.name.clone(),
            email: update.email.clone(),
            role: update.roles.as_slice().to_vec(),
            status: update.status,
        };
        if let Err(e) = self.client.update_user(&profile).await {
            self.notices
                .notify(Notice::error(format!("Erro ao atualizar usuário: {e}")));
            return Err(e.into());
        }

        if let Some(password) = update.password() {
            match self.client.update_user_password(update.id, password).await {
                Ok(()) => self.notices.notify(Notice::success("Senha atualizada com sucesso!")),
                Err(e) => self
                    .notices
                    .notify(Notice::warning(format!("Erro ao atualizar senha: {e}"))),
            }
        }

        self.notices.notify(Notice::success("Usuário atualizado com sucesso!"));
        self.refresh().await;
        Ok(())
    }

    /// Optimistic delete: the user leaves the local list before the backend
    /// answers, and the previous list comes back untouched if it refuses.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&mut self, id: UserId) -> Result<(), PortalError> {
        if self.client.current_session().is_none() {
            self.notices.notify(Notice::error("Usuário não autenticado"));
            return Err(PortalError::NotAuthenticated);
        }

        let snapshot = self.users.clone();
        self.users.retain(|u| u.id != id);

        match self.client.delete_user(id).await {
            Ok(()) => {
                tracing::info!(user_id = %id, "user deleted");
                self.notices.notify(Notice::success("Usuário excluído com sucesso!"));
                Ok(())
            }
            Err(e) => {
                self.users = snapshot;
                self.notices
                    .notify(Notice::error(format!("Erro ao excluir usuário: {e}")));
                Err(e.into())
            }
        }
    }

    /// Re-fetch after a successful mutation; a failure here is already
    /// reported by `fetch` and does not undo the mutation.
    pub(crate) async fn refresh(&mut self) {
        if let Err(e) = self.fetch().await {
            tracing::warn!(error = %e, "directory refresh failed");
        }
    }
}
