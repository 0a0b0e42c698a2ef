//! Domain validation errors.

use thiserror::Error;

/// Errors produced by domain-level validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    /// A field failed format or range validation.
    #[error("invalid {field}: {reason}")]
    InvalidField {
        /// Field that failed validation.
        field: &'static str,
        /// Human-readable reason.
        reason: String,
    },

    /// A patch document is malformed.
    #[error("invalid patch: {0}")]
    InvalidPatch(String),
}

impl DomainError {
    /// Convenience constructor for a field validation failure.
    pub fn invalid_field(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
