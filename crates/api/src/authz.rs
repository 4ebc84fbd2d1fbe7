//! API-side role gate.
//!
//! API surfaces are guarded exactly like the portal view they back, so a
//! caller who cannot open `/usuarios` cannot call `/users` either.

use aluguetudo_auth::{AuthzError, View, authorize, explain_access};

use crate::context::PrincipalContext;

/// Check the caller against the roles required by `view`.
pub fn authorize_view(principal: &PrincipalContext, view: &View) -> Result<(), AuthzError> {
    let explanation = explain_access(principal.roles(), view.required_roles);
    tracing::debug!(
        principal_id = %principal.principal_id(),
        path = view.path,
        granted = explanation.granted,
        reason = %explanation.reason,
        "role gate"
    );

    authorize(principal.principal(), view.required_roles)
}

#[cfg(test)]
mod tests {
    use super::*;

    use aluguetudo_auth::{Principal, Role, RoleSet, UserStatus, views};
    use aluguetudo_core::UserId;
    use chrono::Utc;

    fn ctx(roles: &[&'static str]) -> PrincipalContext {
        PrincipalContext::new(Principal {
            id: UserId::new(),
            email: "x@aluguetudo.com".to_string(),
            display_name: "X".to_string(),
            roles: RoleSet::new(roles.iter().map(|r| Role::from_static(*r))).unwrap(),
            status: UserStatus::Active,
            created_at: Utc::now(),
        })
    }

    #[test]
    fn user_management_requires_admin() {
        assert!(authorize_view(&ctx(&["admin"]), &views::USERS).is_ok());
        assert!(authorize_view(&ctx(&["rh", "financeiro"]), &views::USERS).is_err());
    }

    #[test]
    fn open_views_admit_any_principal() {
        assert!(authorize_view(&ctx(&["operacional"]), &views::TASKS).is_ok());
    }
}
