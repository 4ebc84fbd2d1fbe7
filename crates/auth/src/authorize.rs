//! The role gate: one policy function shared by route guards, navigation and
//! API handlers.
//!
//! This is advisory authorization. The backend's row-level security remains
//! the authority for data access.

use serde::Serialize;
use thiserror::Error;

use crate::Principal;
use crate::roles::ADMIN;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: requires one of {0:?}")]
    Forbidden(Vec<String>),
}

/// Decide whether a role set may reach something guarded by `required`.
///
/// Granted iff `required` is empty, or the sets intersect, or `roles`
/// contains `admin`.
///
/// - No IO
/// - No panics
pub fn can_access<R, Q>(roles: &[R], required: &[Q]) -> bool
where
    R: AsRef<str>,
    Q: AsRef<str>,
{
    required.is_empty()
        || roles.iter().any(|r| {
            let r = r.as_ref();
            r == ADMIN || required.iter().any(|q| q.as_ref() == r)
        })
}

/// Authorize a principal against a required role set.
pub fn authorize<Q: AsRef<str>>(principal: &Principal, required: &[Q]) -> Result<(), AuthzError> {
    if can_access(principal.roles.as_slice(), required) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(
            required.iter().map(|q| q.as_ref().to_string()).collect(),
        ))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Access Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Why a gate decision came out the way it did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessExplanation {
    pub granted: bool,
    pub reason: String,
    pub required_roles: Vec<String>,
    pub held_roles: Vec<String>,
    /// Roles present in both sets (empty when granted through `admin` or an open view).
    pub matched_roles: Vec<String>,
    pub has_admin: bool,
}

/// Explain a role-gate decision.
///
/// Always agrees with [`can_access`]; it only adds detail for logs and
/// denial responses.
pub fn explain_access<R, Q>(roles: &[R], required: &[Q]) -> AccessExplanation
where
    R: AsRef<str>,
    Q: AsRef<str>,
{
    let held_roles: Vec<String> = roles.iter().map(|r| r.as_ref().to_string()).collect();
    let required_roles: Vec<String> = required.iter().map(|q| q.as_ref().to_string()).collect();
    let has_admin = held_roles.iter().any(|r| r == ADMIN);

    let mut matched_roles: Vec<String> = held_roles
        .iter()
        .filter(|r| required_roles.contains(r))
        .cloned()
        .collect();
    matched_roles.sort();
    matched_roles.dedup();

    let (granted, reason) = if required_roles.is_empty() {
        (true, "view has no required roles".to_string())
    } else if !matched_roles.is_empty() {
        (true, format!("principal holds required role(s) {matched_roles:?}"))
    } else if has_admin {
        (true, "principal holds the 'admin' role".to_string())
    } else {
        (
            false,
            format!("principal roles {held_roles:?} do not intersect required {required_roles:?}"),
        )
    };

    AccessExplanation {
        granted,
        reason,
        required_roles,
        held_roles,
        matched_roles,
        has_admin,
    }
}
