//! Error types for service operations
//!
//! Every failure a request can produce maps to one of these variants, and
//! each variant carries a stable machine-readable code that callers can
//! branch on without parsing messages.

use std::time::Duration;

use thiserror::Error;

use crate::hierarchy::HierarchyError;
use org_domain::DomainError;
use org_store::StoreError;

/// Service error types.
///
/// These cover request decoding, domain validation, hierarchy rules,
/// storage failures and dispatch-level limits.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The requested entity does not exist (or is deleted).
    #[error("{0}")]
    NotFound(String),

    /// The request conflicts with existing state.
    #[error("{0}")]
    Conflict(String),

    /// The request payload failed validation.
    #[error("{0}")]
    Validation(String),

    /// A parent-child hierarchy rule was violated.
    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),

    /// The backing store could not serve the request.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// The operation name is not part of the service surface.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// The request exceeded the dispatch deadline.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    /// Get error code for response envelopes.
    pub fn error_code(&self) -> &'static str {
        match self {
            ServiceError::NotFound(_) => "NOT_FOUND",
            ServiceError::Conflict(_) => "CONFLICT",
            ServiceError::Validation(_) => "VALIDATION_ERROR",
            ServiceError::Hierarchy(_) => "HIERARCHY_ERROR",
            ServiceError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            ServiceError::UnsupportedOperation(_) => "UNSUPPORTED_OPERATION",
            ServiceError::Timeout(_) => "TIMEOUT",
        }
    }

    /// Structured detail payload, when the variant carries one.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            ServiceError::Hierarchy(err) => Some(err.details()),
            _ => None,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { collection, org_id } => {
                ServiceError::NotFound(format!("{org_id} not found in {collection}"))
            }
            StoreError::Conflict { field, value, .. } => {
                ServiceError::Conflict(format!("{field} '{value}' is already in use"))
            }
            other => ServiceError::StoreUnavailable(other.to_string()),
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        ServiceError::Validation(err.to_string())
    }
}
