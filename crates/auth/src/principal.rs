use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use aluguetudo_core::{Entity, UserId};

use crate::RoleSet;

/// Account activation status.
///
/// The backend stores the Portuguese tags, so the wire format keeps them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum UserStatus {
    #[default]
    #[serde(rename = "ativo")]
    Active,
    #[serde(rename = "inativo")]
    Inactive,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "ativo",
            UserStatus::Inactive => "inativo",
        }
    }
}

impl core::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An authenticated (or managed) identity with its role set.
///
/// # Invariants
/// - `roles` is never empty (guaranteed by [`RoleSet`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: UserId,
    pub email: String,
    #[serde(rename = "name")]
    pub display_name: String,
    #[serde(rename = "role")]
    pub roles: RoleSet,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.roles.is_admin()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    /// Case-insensitive match on display name or email.
    pub fn matches_query(&self, query: &str) -> bool {
        let q = query.trim().to_lowercase();
        q.is_empty()
            || self.display_name.to_lowercase().contains(&q)
            || self.email.to_lowercase().contains(&q)
    }
}

impl Entity for Principal {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;

    fn sample() -> Principal {
        Principal {
            id: UserId::new(),
            email: "Maria.Souza@aluguetudo.com".to_string(),
            display_name: "Maria Souza".to_string(),
            roles: RoleSet::single(Role::new("rh")),
            status: UserStatus::Active,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn status_uses_backend_tags_on_the_wire() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["status"], "ativo");
        assert_eq!(json["role"], serde_json::json!(["rh"]));
        assert_eq!(json["name"], "Maria Souza");
    }

    #[test]
    fn query_matches_name_or_email_ignoring_case() {
        let p = sample();
        assert!(p.matches_query("maria"));
        assert!(p.matches_query("ALUGUETUDO"));
        assert!(p.matches_query(""));
        assert!(!p.matches_query("joao"));
    }
}
