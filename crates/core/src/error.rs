//! Errors raised by bundle and catalog rules.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// A bundle or catalog rule refused an input or a state change.
///
/// Only deterministic failures live here; platform and storage failures have
/// their own error types in the crates that talk to them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Rejected input: empty title, a variant id where a product id belongs.
    #[error("invalid input: {0}")]
    Validation(String),

    /// State that cannot occur for a well-formed bundle or mapping.
    #[error("bundle rule broken: {0}")]
    InvariantViolation(String),

    /// A shop domain or global id that does not parse.
    #[error("malformed id: {0}")]
    InvalidId(String),

    #[error("no such bundle")]
    NotFound,

    /// The change collides with the bundle's current state (already created,
    /// already deleted).
    #[error("conflicting change: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        DomainError::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        DomainError::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        DomainError::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        DomainError::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        DomainError::NotFound
    }
}
