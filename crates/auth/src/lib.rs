//! `aluguetudo-auth`: pure authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and from the backend
//! platform: it knows roles, principals, the role gate, the view registry,
//! token claims and session lifecycle, and nothing about how they are fetched.

pub mod account;
pub mod authorize;
pub mod claims;
pub mod principal;
pub mod roles;
pub mod session;
pub mod views;

pub use account::{AccountUpdate, NewAccount, UserDraft, ValidationError};
pub use authorize::{AccessExplanation, AuthzError, authorize, can_access, explain_access};
pub use claims::{
    Hs256JwtIssuer, Hs256JwtValidator, JwtClaims, JwtValidator, TokenValidationError,
    validate_claims,
};
pub use principal::{Principal, UserStatus};
pub use roles::{Role, RoleSet};
pub use session::{Session, SessionState};
pub use views::{
    HOME_PATH, LOGIN_PATH, NavItem, NavSection, RouteDecision, Section, View, find_view, navigation, resolve,
};
