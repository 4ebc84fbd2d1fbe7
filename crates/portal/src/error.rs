use thiserror::Error;

use aluguetudo_auth::ValidationError;
use aluguetudo_core::DomainError;
use aluguetudo_gateway::GatewayError;

#[derive(Debug, Error)]
pub enum PortalError {
    /// Form input rejected before any backend call.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("email and password are required")]
    MissingCredentials,

    #[error("not authenticated")]
    NotAuthenticated,

    #[error("session expired")]
    SessionExpired,

    #[error("invalid bootstrap credentials")]
    InvalidBootstrapCredentials,

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl PortalError {
    /// Whether the caller has to sign in (again) before retrying.
    pub fn requires_login(&self) -> bool {
        match self {
            PortalError::NotAuthenticated | PortalError::SessionExpired => true,
            PortalError::Gateway(e) => e.is_unauthorized(),
            _ => false,
        }
    }

    /// Whether the backend failed to answer rather than refusing the request.
    pub fn is_backend_outage(&self) -> bool {
        matches!(self, PortalError::Gateway(e) if e.is_outage())
    }
}
