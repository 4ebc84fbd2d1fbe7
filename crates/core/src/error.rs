//! Errors raised by the portal's own rules (roles, task board, ids).

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// A request the domain rejects before any backend is involved.
///
/// Backend and transport failures are `GatewayError`s, never these.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Rejected input: blank task title, unknown status, empty role set.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A user or task id that is not a UUID.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A task command its current state forbids, such as advancing a
    /// completed task.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// No task with that id on the owner's board.
    #[error("not found")]
    NotFound,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_the_detail() {
        assert_eq!(
            DomainError::validation("task title cannot be empty").to_string(),
            "validation failed: task title cannot be empty"
        );
        assert_eq!(
            DomainError::invariant("task is already completed").to_string(),
            "invariant violated: task is already completed"
        );
        assert_eq!(DomainError::NotFound.to_string(), "not found");
    }
}
