//! Wire records exchanged with the backend platform.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use aluguetudo_auth::{Principal, Role, RoleSet, UserStatus};
use aluguetudo_core::{DomainError, UserId};

/// Profile fields stored alongside an auth identity (`user_metadata`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileMetadata {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Vec<Role>,
    #[serde(default)]
    pub status: Option<UserStatus>,
}

/// An identity as the auth service reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: ProfileMetadata,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl AuthUser {
    /// Build a principal from auth metadata alone (no profile row available).
    pub fn to_principal(&self) -> Result<Principal, DomainError> {
        Ok(Principal {
            id: self.id,
            email: self.email.clone().unwrap_or_default(),
            display_name: self
                .user_metadata
                .name
                .clone()
                .or_else(|| self.email.clone())
                .unwrap_or_default(),
            roles: RoleSet::new(self.user_metadata.role.iter().cloned())?,
            status: self.user_metadata.status.unwrap_or_default(),
            created_at: self.created_at.unwrap_or_else(Utc::now),
        })
    }
}

/// A row of the `users` profile table.
///
/// Rows are decoded leniently (an empty role array is representable) and
/// validated when converted into a [`Principal`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRow {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Vec<Role>,
    #[serde(default)]
    pub status: UserStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl UserRow {
    pub fn into_principal(self) -> Result<Principal, DomainError> {
        Ok(Principal {
            id: self.id,
            email: self.email,
            display_name: self.name,
            roles: RoleSet::new(self.role)?,
            status: self.status,
            created_at: self.created_at.unwrap_or_else(Utc::now),
        })
    }

    pub fn is_admin(&self) -> bool {
        self.role.iter().any(Role::is_admin)
    }
}

impl From<&Principal> for UserRow {
    fn from(p: &Principal) -> Self {
        Self {
            id: p.id,
            name: p.display_name.clone(),
            email: p.email.clone(),
            role: p.roles.as_slice().to_vec(),
            status: p.status,
            created_at: Some(p.created_at),
        }
    }
}

/// Arguments of the sign-up primitive.
#[derive(Debug)]
pub struct SignUpRequest {
    pub email: String,
    pub password: SecretString,
    pub metadata: ProfileMetadata,
    /// Where a confirmation e-mail should land.
    pub email_redirect_to: Option<String>,
}

impl SignUpRequest {
    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }
}

/// What the sign-up primitive returns.
///
/// When the platform auto-confirms, `session` belongs to the *new* account.
#[derive(Debug, Clone)]
pub struct SignUpResponse {
    pub user: Option<AuthUser>,
    pub session: Option<aluguetudo_auth::Session>,
}

/// Arguments of the privileged `create_new_auth_user` procedure.
#[derive(Debug)]
pub struct NewAuthUser {
    pub email: String,
    pub password: SecretString,
    pub name: String,
    pub role: Vec<Role>,
    pub status: UserStatus,
}

impl NewAuthUser {
    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }
}

/// Arguments of the `update_user` procedure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub role: Vec<Role>,
    pub status: UserStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_without_roles_decodes_but_is_not_a_valid_principal() {
        let row: UserRow = serde_json::from_value(serde_json::json!({
            "id": UserId::new(),
            "name": "Sem Papel",
            "email": "x@aluguetudo.com",
            "role": [],
            "status": "inativo"
        }))
        .unwrap();
        assert_eq!(row.status, UserStatus::Inactive);
        assert!(row.into_principal().is_err());
    }

    #[test]
    fn auth_user_falls_back_to_email_for_name() {
        let user = AuthUser {
            id: UserId::new(),
            email: Some("ana@aluguetudo.com".to_string()),
            user_metadata: ProfileMetadata {
                name: None,
                role: vec![Role::new("rh")],
                status: None,
            },
            created_at: None,
        };
        let p = user.to_principal().unwrap();
        assert_eq!(p.display_name, "ana@aluguetudo.com");
        assert_eq!(p.status, UserStatus::Active);
    }
}
