//! In-process backend.
//!
//! Intended for tests/dev. It reproduces the platform behaviors the portal
//! depends on: row-level security on the profile table and admin procedures,
//! sign-up issuing a session for the new account, and refresh-token rotation.
//! Any operation can be made to fail with [`InMemoryBackend::fail`].

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use aluguetudo_auth::{Role, Session, UserStatus};
use aluguetudo_core::UserId;

use crate::model::{AuthUser, NewAuthUser, ProfileMetadata, ProfileUpdate, SignUpRequest, SignUpResponse, UserRow};
use crate::{Backend, GatewayError};

/// Backend operations, for fault injection and call accounting.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Op {
    SignIn,
    SignOut,
    GetUser,
    RefreshSession,
    SignUp,
    InsertUserRow,
    SelectAdmins,
    GetUserRow,
    GetAllUsers,
    CreateNewAuthUser,
    CreateUserProfile,
    UpdateUser,
    UpdateUserPassword,
    DeleteUser,
}

#[derive(Debug, Clone)]
struct Account {
    email: String,
    password: String,
    metadata: ProfileMetadata,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct State {
    accounts: HashMap<UserId, Account>,
    rows: BTreeMap<UserId, UserRow>,
    /// access token -> session
    sessions: HashMap<String, Session>,
    /// live refresh tokens -> owner
    refresh_tokens: HashMap<String, UserId>,
    faults: HashSet<Op>,
    calls: Vec<Op>,
}

#[derive(Debug)]
pub struct InMemoryBackend {
    state: Mutex<State>,
    session_ttl: Duration,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn token() -> String {
    Uuid::now_v7().simple().to_string()
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::with_session_ttl(Duration::hours(1))
    }

    pub fn with_session_ttl(session_ttl: Duration) -> Self {
        Self {
            state: Mutex::new(State::default()),
            session_ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Make every subsequent call of `op` fail until [`heal`](Self::heal).
    pub fn fail(&self, op: Op) {
        self.lock().faults.insert(op);
    }

    pub fn heal(&self, op: Op) {
        self.lock().faults.remove(&op);
    }

    pub fn calls(&self) -> Vec<Op> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, op: Op) -> usize {
        self.lock().calls.iter().filter(|c| **c == op).count()
    }

    pub fn row(&self, id: UserId) -> Option<UserRow> {
        self.lock().rows.get(&id).cloned()
    }

    pub fn account_exists(&self, email: &str) -> bool {
        let email = email.to_lowercase();
        self.lock().accounts.values().any(|a| a.email == email)
    }

    /// Invalidate every outstanding session and refresh token.
    pub fn revoke_all_sessions(&self) {
        let mut state = self.lock();
        state.sessions.clear();
        state.refresh_tokens.clear();
    }

    /// Create an identity plus its profile row, bypassing every policy.
    pub fn seed_user(&self, email: &str, password: &str, name: &str, roles: &[&str]) -> UserId {
        let id = UserId::new();
        let now = Utc::now();
        let role: Vec<Role> = roles.iter().map(|r| Role::new(r.to_string())).collect();
        let mut state = self.lock();
        state.accounts.insert(
            id,
            Account {
                email: email.to_lowercase(),
                password: password.to_string(),
                metadata: ProfileMetadata {
                    name: Some(name.to_string()),
                    role: role.clone(),
                    status: Some(UserStatus::Active),
                },
                created_at: now,
            },
        );
        state.rows.insert(
            id,
            UserRow {
                id,
                name: name.to_string(),
                email: email.to_lowercase(),
                role,
                status: UserStatus::Active,
                created_at: Some(now),
            },
        );
        id
    }

    /// Record the call and honor injected faults.
    fn enter(&self, op: Op) -> Result<MutexGuard<'_, State>, GatewayError> {
        let mut state = self.lock();
        state.calls.push(op);
        if state.faults.contains(&op) {
            return Err(GatewayError::Unavailable(format!("injected failure for {op:?}")));
        }
        Ok(state)
    }

    fn issue_session(&self, state: &mut State, user_id: UserId) -> Session {
        let session = Session {
            access_token: token(),
            refresh_token: token(),
            expires_at: Utc::now() + self.session_ttl,
            user_id,
        };
        state.sessions.insert(session.access_token.clone(), session.clone());
        state.refresh_tokens.insert(session.refresh_token.clone(), user_id);
        session
    }

    fn create_account(
        state: &mut State,
        email: &str,
        password: &str,
        metadata: ProfileMetadata,
    ) -> Result<UserId, GatewayError> {
        let email = email.trim().to_lowercase();
        if state.accounts.values().any(|a| a.email == email) {
            return Err(GatewayError::api(422, "User already registered"));
        }
        if password.len() < 6 {
            return Err(GatewayError::api(422, "Password should be at least 6 characters"));
        }
        let id = UserId::new();
        state.accounts.insert(
            id,
            Account {
                email,
                password: password.to_string(),
                metadata,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }
}

fn auth_user(id: UserId, account: &Account) -> AuthUser {
    AuthUser {
        id,
        email: Some(account.email.clone()),
        user_metadata: account.metadata.clone(),
        created_at: Some(account.created_at),
    }
}

/// Resolve the caller of an authenticated request.
fn caller(state: &State, session: &Session) -> Result<UserId, GatewayError> {
    match state.sessions.get(&session.access_token) {
        Some(live) if live.expires_at > Utc::now() => Ok(live.user_id),
        Some(_) => Err(GatewayError::Unauthorized("JWT expired".to_string())),
        None => Err(GatewayError::Unauthorized("invalid session".to_string())),
    }
}

/// Row-level policy for admin procedures: caller's profile must hold `admin`.
fn require_admin(state: &State, session: &Session) -> Result<UserId, GatewayError> {
    let id = caller(state, session)?;
    match state.rows.get(&id) {
        Some(row) if row.is_admin() => Ok(id),
        _ => Err(GatewayError::Unauthorized(
            "permission denied: admin role required".to_string(),
        )),
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, GatewayError> {
        let mut state = self.enter(Op::SignIn)?;
        let email = email.trim().to_lowercase();
        let id = state
            .accounts
            .iter()
            .find(|(_, a)| a.email == email && a.password == password)
            .map(|(id, _)| *id)
            .ok_or_else(|| GatewayError::api(400, "Invalid login credentials"))?;
        Ok(self.issue_session(&mut state, id))
    }

    async fn sign_out(&self, session: &Session) -> Result<(), GatewayError> {
        let mut state = self.enter(Op::SignOut)?;
        state.sessions.remove(&session.access_token);
        state.refresh_tokens.remove(&session.refresh_token);
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, GatewayError> {
        let state = self.enter(Op::GetUser)?;
        let session = state
            .sessions
            .get(access_token)
            .ok_or_else(|| GatewayError::Unauthorized("invalid session".to_string()))?;
        let id = caller(&state, session)?;
        let account = state
            .accounts
            .get(&id)
            .ok_or_else(|| GatewayError::NotFound("user".to_string()))?;
        Ok(auth_user(id, account))
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, GatewayError> {
        let mut state = self.enter(Op::RefreshSession)?;
        let owner = state
            .refresh_tokens
            .remove(refresh_token)
            .ok_or_else(|| GatewayError::Unauthorized("Invalid Refresh Token".to_string()))?;
        Ok(self.issue_session(&mut state, owner))
    }

    async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpResponse, GatewayError> {
        let mut state = self.enter(Op::SignUp)?;
        let id = Self::create_account(
            &mut state,
            &request.email,
            request.password(),
            request.metadata.clone(),
        )?;
        let session = self.issue_session(&mut state, id);
        let user = state.accounts.get(&id).map(|a| auth_user(id, a));
        Ok(SignUpResponse {
            user,
            session: Some(session),
        })
    }

    async fn insert_user_row(&self, session: Option<&Session>, row: &UserRow) -> Result<(), GatewayError> {
        let mut state = self.enter(Op::InsertUserRow)?;
        let session =
            session.ok_or_else(|| GatewayError::Unauthorized("anonymous insert denied".to_string()))?;
        let caller_id = caller(&state, session)?;
        let caller_is_admin = state.rows.get(&caller_id).is_some_and(UserRow::is_admin);

        if caller_id != row.id && !caller_is_admin {
            return Err(GatewayError::Unauthorized(
                "new row violates row-level security policy for table \"users\"".to_string(),
            ));
        }
        if state.rows.contains_key(&row.id) {
            return Err(GatewayError::api(409, "duplicate key value violates unique constraint"));
        }
        let mut row = row.clone();
        row.created_at.get_or_insert_with(Utc::now);
        state.rows.insert(row.id, row);
        Ok(())
    }

    async fn select_admins(&self, _session: Option<&Session>, limit: usize) -> Result<Vec<UserRow>, GatewayError> {
        let state = self.enter(Op::SelectAdmins)?;
        Ok(state
            .rows
            .values()
            .filter(|r| r.is_admin())
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get_user_row(&self, session: &Session, id: UserId) -> Result<Option<UserRow>, GatewayError> {
        let state = self.enter(Op::GetUserRow)?;
        let caller_id = caller(&state, session)?;
        let caller_is_admin = state.rows.get(&caller_id).is_some_and(UserRow::is_admin);
        if caller_id != id && !caller_is_admin {
            return Ok(None);
        }
        Ok(state.rows.get(&id).cloned())
    }

    async fn get_all_users(&self, session: &Session) -> Result<Vec<UserRow>, GatewayError> {
        let state = self.enter(Op::GetAllUsers)?;
        require_admin(&state, session)?;
        let mut rows: Vec<UserRow> = state.rows.values().cloned().collect();
        rows.sort_by_key(|r| r.created_at);
        Ok(rows)
    }

    async fn create_new_auth_user(
        &self,
        session: &Session,
        args: &NewAuthUser,
    ) -> Result<Option<UserId>, GatewayError> {
        let mut state = self.enter(Op::CreateNewAuthUser)?;
        require_admin(&state, session)?;

        let email = args.email.trim().to_lowercase();
        if let Some((id, _)) = state.accounts.iter().find(|(_, a)| a.email == email) {
            return Ok(Some(*id));
        }

        let id = Self::create_account(
            &mut state,
            &email,
            args.password(),
            ProfileMetadata {
                name: Some(args.name.clone()),
                role: args.role.clone(),
                status: Some(args.status),
            },
        )?;
        state.rows.insert(
            id,
            UserRow {
                id,
                name: args.name.clone(),
                email,
                role: args.role.clone(),
                status: args.status,
                created_at: Some(Utc::now()),
            },
        );
        Ok(Some(id))
    }

    async fn create_user_profile(&self, session: &Session, row: &UserRow) -> Result<(), GatewayError> {
        let mut state = self.enter(Op::CreateUserProfile)?;
        require_admin(&state, session)?;
        if !state.accounts.contains_key(&row.id) {
            return Err(GatewayError::NotFound("auth user".to_string()));
        }
        let mut row = row.clone();
        row.created_at.get_or_insert_with(Utc::now);
        state.rows.insert(row.id, row);
        Ok(())
    }

    async fn update_user(&self, session: &Session, update: &ProfileUpdate) -> Result<(), GatewayError> {
        let mut state = self.enter(Op::UpdateUser)?;
        require_admin(&state, session)?;
        let row = state
            .rows
            .get_mut(&update.user_id)
            .ok_or_else(|| GatewayError::NotFound("user".to_string()))?;
        row.name = update.name.clone();
        row.email = update.email.clone();
        row.role = update.role.clone();
        row.status = update.status;
        if let Some(account) = state.accounts.get_mut(&update.user_id) {
            account.email = update.email.clone();
        }
        Ok(())
    }

    async fn update_user_password(
        &self,
        session: &Session,
        user_id: UserId,
        new_password: &str,
    ) -> Result<(), GatewayError> {
        let mut state = self.enter(Op::UpdateUserPassword)?;
        require_admin(&state, session)?;
        if new_password.len() < 6 {
            return Err(GatewayError::api(422, "Password should be at least 6 characters"));
        }
        let account = state
            .accounts
            .get_mut(&user_id)
            .ok_or_else(|| GatewayError::NotFound("user".to_string()))?;
        account.password = new_password.to_string();
        Ok(())
    }

    async fn delete_user(&self, session: &Session, user_id: UserId) -> Result<(), GatewayError> {
        let mut state = self.enter(Op::DeleteUser)?;
        require_admin(&state, session)?;
        if state.accounts.remove(&user_id).is_none() && state.rows.remove(&user_id).is_none() {
            return Err(GatewayError::NotFound("user".to_string()));
        }
        state.rows.remove(&user_id);
        state.sessions.retain(|_, s| s.user_id != user_id);
        state.refresh_tokens.retain(|_, owner| *owner != user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn new_user(email: &str) -> NewAuthUser {
        NewAuthUser {
            email: email.to_string(),
            password: SecretString::from("segredo1".to_string()),
            name: "Pedro".to_string(),
            role: vec![Role::new("operacional")],
            status: UserStatus::Active,
        }
    }

    #[tokio::test]
    async fn create_new_auth_user_is_idempotent_by_email() {
        let backend = InMemoryBackend::new();
        backend.seed_user("admin@aluguetudo.com", "admin123", "Admin", &["admin"]);
        let admin = backend.sign_in_with_password("admin@aluguetudo.com", "admin123").await.unwrap();

        let first = backend.create_new_auth_user(&admin, &new_user("pedro@x.com")).await.unwrap();
        let second = backend.create_new_auth_user(&admin, &new_user("PEDRO@x.com")).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(backend.get_all_users(&admin).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn admin_procedures_reject_non_admins() {
        let backend = InMemoryBackend::new();
        backend.seed_user("rh@aluguetudo.com", "rh12345", "RH", &["rh"]);
        let rh = backend.sign_in_with_password("rh@aluguetudo.com", "rh12345").await.unwrap();

        let err = backend.get_all_users(&rh).await.unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn refresh_tokens_rotate() {
        let backend = InMemoryBackend::new();
        backend.seed_user("a@x.com", "abcdef", "A", &["rh"]);
        let s = backend.sign_in_with_password("a@x.com", "abcdef").await.unwrap();

        let fresh = backend.refresh_session(&s.refresh_token).await.unwrap();
        assert_eq!(fresh.user_id, s.user_id);
        assert!(backend.refresh_session(&s.refresh_token).await.is_err());
    }

    #[tokio::test]
    async fn injected_faults_are_recorded_and_healable() {
        let backend = InMemoryBackend::new();
        backend.fail(Op::SelectAdmins);
        assert!(matches!(
            backend.select_admins(None, 1).await,
            Err(GatewayError::Unavailable(_))
        ));
        backend.heal(Op::SelectAdmins);
        assert!(backend.select_admins(None, 1).await.unwrap().is_empty());
        assert_eq!(backend.call_count(Op::SelectAdmins), 2);
    }

    #[tokio::test]
    async fn profile_insert_follows_row_policy() {
        let backend = InMemoryBackend::new();
        backend.seed_user("rh@x.com", "rh12345", "RH", &["rh"]);
        let rh = backend.sign_in_with_password("rh@x.com", "rh12345").await.unwrap();

        let someone_else = UserRow {
            id: UserId::new(),
            name: "X".to_string(),
            email: "x@x.com".to_string(),
            role: vec![Role::new("rh")],
            status: UserStatus::Active,
            created_at: None,
        };
        assert!(backend.insert_user_row(Some(&rh), &someone_else).await.is_err());
        assert!(backend.insert_user_row(None, &someone_else).await.is_err());
    }
}
