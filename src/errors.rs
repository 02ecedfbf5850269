//! Error types for the Ankpool platform core.
//!
//! Every rejection carries a stable code for the HTTP layer plus a
//! human-readable message. Validation and precondition failures are raised
//! before any state is mutated.

use crate::common::types::Amount;

/// Root error type for all platform operations
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// Malformed input, rejected before any mutation
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced record does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A debit would take a balance below zero
    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: Amount, available: Amount },

    /// Operation not valid in the current state
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// A unique key already exists
    #[error("conflict: {0}")]
    Conflict(String),

    /// The acting role is not permitted to perform the operation
    #[error("forbidden: {0}")]
    Forbidden(String),
}

impl PlatformError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Stable classification code exposed to callers
    pub fn code(&self) -> &'static str {
        match self {
            PlatformError::Validation(_) => "VALIDATION",
            PlatformError::NotFound { .. } => "NOT_FOUND",
            PlatformError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            PlatformError::Precondition(_) => "PRECONDITION",
            PlatformError::Conflict(_) => "CONFLICT",
            PlatformError::Forbidden(_) => "FORBIDDEN",
        }
    }
}

pub type PlatformResult<T> = Result<T, PlatformError>;
