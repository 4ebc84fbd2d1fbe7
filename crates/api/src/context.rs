use aluguetudo_auth::{Principal, Role, Session};
use aluguetudo_core::UserId;

/// Principal context for a request (authenticated identity + roles).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn new(principal: Principal) -> Self {
        Self { principal }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn principal_id(&self) -> UserId {
        self.principal.id
    }

    pub fn roles(&self) -> &[Role] {
        self.principal.roles.as_slice()
    }
}

/// The bearer token of a request and the backend session registered for it.
#[derive(Debug, Clone)]
pub struct SessionContext {
    token: String,
    session: Session,
}

impl SessionContext {
    pub fn new(token: String, session: Session) -> Self {
        Self { token, session }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn session(&self) -> &Session {
        &self.session
    }
}
