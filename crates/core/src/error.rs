//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic business/domain failures (validation,
/// invariants, conflicts). Store failures travel through `Store` unchanged so
/// callers can tell them apart from domain rejections.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input, out-of-range quantity).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An operation is not defined for the operands (e.g. mixed currencies).
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// The aggregate is not in a state that permits the transition.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A requested entity was not found.
    #[error("not found")]
    NotFound,

    /// A unique business key collided (e.g. duplicate email or SKU).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A consumable resource would underflow (e.g. stock reduction).
    #[error("insufficient resource: {0}")]
    InsufficientResource(String),

    /// The backing store rejected an operation; propagated unchanged.
    #[error("store error: {0}")]
    Store(StoreError),
}

impl DomainError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn insufficient(msg: impl Into<String>) -> Self {
        Self::InsufficientResource(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}

impl From<StoreError> for DomainError {
    fn from(value: StoreError) -> Self {
        // Unique-key collisions are business conflicts regardless of which
        // backend detected them.
        match value {
            StoreError::UniqueViolation(msg) => Self::Conflict(msg),
            other => Self::Store(other),
        }
    }
}

/// Failure raised by the store backing a repository.
///
/// These are infrastructure failures (commit rejection, cancellation) as
/// opposed to deterministic domain failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A unique business key (user email, product SKU) collided.
    #[error("unique key violation: {0}")]
    UniqueViolation(String),

    /// A staged mutation targets a row that does not exist.
    #[error("row missing: {0}")]
    Missing(String),

    /// The cancellation signal fired before the durable write step.
    #[error("operation cancelled")]
    Cancelled,

    /// Backend failure (lock poisoning, serialization, transport).
    #[error("backend failure: {0}")]
    Backend(String),
}
