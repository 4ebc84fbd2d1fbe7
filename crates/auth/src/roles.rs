use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use aluguetudo_core::DomainError;

/// Superuser role tag: grants access to every view.
pub const ADMIN: &str = "admin";
pub const RH: &str = "rh";
pub const FINANCEIRO: &str = "financeiro";
pub const COMERCIAL: &str = "comercial";
pub const OPERACIONAL: &str = "operacional";

/// Roles offered when provisioning an account, with their display labels.
pub const KNOWN_ROLES: &[(&str, &str)] = &[
    (ADMIN, "Administrador"),
    (RH, "RH"),
    (FINANCEIRO, "Financeiro"),
    (COMERCIAL, "Comercial"),
    (OPERACIONAL, "Operacional"),
];

/// Role identifier used by the role gate.
///
/// Roles are opaque strings at this layer. Unknown tags are carried through
/// untouched; they simply never match a view's required set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn admin() -> Self {
        Self::from_static(ADMIN)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_admin(&self) -> bool {
        self.as_str() == ADMIN
    }

    /// Display label for known roles (falls back to the raw tag).
    pub fn label(&self) -> &str {
        KNOWN_ROLES
            .iter()
            .find(|(id, _)| *id == self.as_str())
            .map(|(_, label)| *label)
            .unwrap_or_else(|| self.as_str())
    }
}

impl AsRef<str> for Role {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Non-empty, deduplicated set of roles held by a valid user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Role>", into = "Vec<Role>")]
pub struct RoleSet(Vec<Role>);

impl RoleSet {
    /// Build a role set, rejecting an empty selection.
    ///
    /// Blank tags are dropped and duplicates collapsed; order is normalized.
    pub fn new(roles: impl IntoIterator<Item = Role>) -> Result<Self, DomainError> {
        let mut roles: Vec<Role> = roles
            .into_iter()
            .filter(|r| !r.as_str().trim().is_empty())
            .collect();
        roles.sort();
        roles.dedup();

        if roles.is_empty() {
            return Err(DomainError::validation("at least one role is required"));
        }
        Ok(Self(roles))
    }

    pub fn single(role: Role) -> Self {
        Self(vec![role])
    }

    pub fn as_slice(&self) -> &[Role] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Role> {
        self.0.iter()
    }

    pub fn contains(&self, role: &str) -> bool {
        self.0.iter().any(|r| r.as_str() == role)
    }

    pub fn is_admin(&self) -> bool {
        self.contains(ADMIN)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a constructed set; provided for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Vec<Role>> for RoleSet {
    type Error = DomainError;

    fn try_from(value: Vec<Role>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RoleSet> for Vec<Role> {
    fn from(value: RoleSet) -> Self {
        value.0
    }
}
