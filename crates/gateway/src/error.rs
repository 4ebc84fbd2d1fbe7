use thiserror::Error;

/// Failures talking to the backend platform.
///
/// Messages from the platform are passed through untouched; callers surface
/// them to the user as-is.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The platform answered with an error.
    #[error("backend error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Credentials missing, expired, or rejected by row-level security.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// The response body did not have the expected shape.
    #[error("decode error: {0}")]
    Decode(String),

    /// A call needed the held session but none is present.
    #[error("no active session")]
    NoSession,

    /// Injected or transient unavailability.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

impl GatewayError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_) | Self::NoSession)
    }

    /// The platform could not answer, as opposed to rejecting the request.
    pub fn is_outage(&self) -> bool {
        match self {
            Self::Http(_) | Self::Unavailable(_) | Self::Decode(_) => true,
            Self::Api { status, .. } => *status >= 500,
            Self::Unauthorized(_) | Self::NotFound(_) | Self::NoSession => false,
        }
    }
}
