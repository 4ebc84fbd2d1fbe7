use async_trait::async_trait;

use aluguetudo_auth::Session;
use aluguetudo_core::UserId;

use crate::GatewayError;
use crate::model::{AuthUser, NewAuthUser, ProfileUpdate, SignUpRequest, SignUpResponse, UserRow};

/// The backend platform: authentication, RLS-protected tables and named
/// server-side procedures.
///
/// Every call takes its credentials explicitly. Calls taking
/// `Option<&Session>` run with the public (anonymous) key when `None`.
#[async_trait]
pub trait Backend: Send + Sync {
    // ── auth ────────────────────────────────────────────────────────────────
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, GatewayError>;

    async fn sign_out(&self, session: &Session) -> Result<(), GatewayError>;

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, GatewayError>;

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, GatewayError>;

    /// Create an identity. On auto-confirming platforms this also issues a
    /// session for the new account.
    async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpResponse, GatewayError>;

    // ── tables ──────────────────────────────────────────────────────────────
    async fn insert_user_row(&self, session: Option<&Session>, row: &UserRow) -> Result<(), GatewayError>;

    async fn select_admins(&self, session: Option<&Session>, limit: usize) -> Result<Vec<UserRow>, GatewayError>;

    async fn get_user_row(&self, session: &Session, id: UserId) -> Result<Option<UserRow>, GatewayError>;

    // ── procedures ──────────────────────────────────────────────────────────
    async fn get_all_users(&self, session: &Session) -> Result<Vec<UserRow>, GatewayError>;

    /// Privileged creation that leaves the caller's session untouched.
    ///
    /// Returns the new (or already existing) identity id.
    async fn create_new_auth_user(
        &self,
        session: &Session,
        args: &NewAuthUser,
    ) -> Result<Option<UserId>, GatewayError>;

    async fn create_user_profile(&self, session: &Session, row: &UserRow) -> Result<(), GatewayError>;

    async fn update_user(&self, session: &Session, update: &ProfileUpdate) -> Result<(), GatewayError>;

    async fn update_user_password(
        &self,
        session: &Session,
        user_id: UserId,
        new_password: &str,
    ) -> Result<(), GatewayError>;

    async fn delete_user(&self, session: &Session, user_id: UserId) -> Result<(), GatewayError>;
}
