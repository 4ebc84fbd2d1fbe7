//! Account form validation.
//!
//! Every check here runs before the backend is contacted, so a rejected draft
//! never produces a network call.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

use aluguetudo_core::UserId;

use crate::{Role, RoleSet, UserStatus};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("name and email are required")]
    MissingNameOrEmail,

    #[error("invalid email format")]
    InvalidEmail,

    #[error("password is required for new users")]
    MissingPassword,

    #[error("select at least one role")]
    NoRoles,

    #[error("an existing user id is required for updates")]
    MissingId,
}

/// What an admin submitted from the user dialog.
///
/// `id` present means "edit an existing account"; absent means "provision".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserDraft {
    #[serde(default)]
    pub id: Option<UserId>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default, alias = "role")]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub status: UserStatus,
}

/// A validated request to provision a new account.
#[derive(Debug)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password: SecretString,
    pub roles: RoleSet,
    pub status: UserStatus,
}

/// A validated edit of an existing account.
#[derive(Debug)]
pub struct AccountUpdate {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub roles: RoleSet,
    pub status: UserStatus,
    /// New password, only when a non-empty one was supplied.
    pub password: Option<SecretString>,
}

impl AccountUpdate {
    pub fn password(&self) -> Option<&str> {
        self.password.as_ref().map(|p| p.expose_secret())
    }
}

impl UserDraft {
    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    fn password_value(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }

    fn common(&self) -> Result<(String, String, RoleSet), ValidationError> {
        let name = self.name.trim();
        let email = self.email.trim();
        if name.is_empty() || email.is_empty() {
            return Err(ValidationError::MissingNameOrEmail);
        }
        if !email.contains('@') {
            return Err(ValidationError::InvalidEmail);
        }
        let roles = RoleSet::new(self.roles.iter().cloned()).map_err(|_| ValidationError::NoRoles)?;
        Ok((name.to_string(), email.to_lowercase(), roles))
    }

    /// Validate a draft for provisioning.
    pub fn validate_new(&self) -> Result<NewAccount, ValidationError> {
        let (name, email, roles) = self.common()?;
        let password = self
            .password_value()
            .ok_or(ValidationError::MissingPassword)?;

        Ok(NewAccount {
            name,
            email,
            password: SecretString::from(password.to_string()),
            roles,
            status: self.status,
        })
    }

    /// Validate a draft for an update of an existing account.
    pub fn validate_update(&self) -> Result<AccountUpdate, ValidationError> {
        let id = self.id.ok_or(ValidationError::MissingId)?;
        let (name, email, roles) = self.common()?;

        Ok(AccountUpdate {
            id,
            name,
            email,
            roles,
            status: self.status,
            password: self
                .password_value()
                .map(|p| SecretString::from(p.to_string())),
        })
    }
}

impl NewAccount {
    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }
}
