//! Parent-child hierarchy validation.
//!
//! Parent assignments are validated against persisted state before any
//! write: the parent must exist and be live, the resulting chain must stay
//! within the configured depth, and the assignment must not create a cycle.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::{json, Value};
use thiserror::Error;

use crate::collections::ORGANIZATIONS;
use crate::error::ServiceResult;
use org_store::{DocumentStore, StoreError};

/// Hierarchy rule violations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HierarchyError {
    /// The candidate parent does not exist or is deleted.
    #[error("parent organization '{0}' not found or deleted")]
    ParentNotFound(String),

    /// The assignment would make the organization its own ancestor.
    #[error("parent assignment would create a cycle involving '{org_id}'")]
    CycleDetected {
        /// Organization whose parent was being set.
        org_id: String,
    },

    /// The assignment would push the tree past its depth limit.
    #[error("organization hierarchy depth limit of {max_depth} exceeded")]
    DepthExceeded {
        /// Configured maximum depth, root included.
        max_depth: usize,
    },
}

impl HierarchyError {
    /// Structured detail payload for error envelopes.
    pub fn details(&self) -> Value {
        match self {
            HierarchyError::ParentNotFound(parent) => json!({ "parent_org_id": parent }),
            HierarchyError::CycleDetected { org_id } => json!({ "org_id": org_id }),
            HierarchyError::DepthExceeded { max_depth } => json!({ "max_depth": max_depth }),
        }
    }
}

/// Validates parent assignments against the organization collection.
#[derive(Clone)]
pub struct HierarchyValidator {
    store: Arc<dyn DocumentStore>,
    max_depth: usize,
}

impl HierarchyValidator {
    /// Create a validator over the given store.
    pub fn new(store: Arc<dyn DocumentStore>, max_depth: usize) -> Self {
        Self { store, max_depth }
    }

    /// Check that `org_id` may take `candidate_parent` as its parent.
    ///
    /// Walks the ancestor chain from the candidate upward. A chain that
    /// revisits a node (or reaches `org_id` itself) is a cycle; a chain of
    /// `max_depth` or more ancestors would place the organization deeper
    /// than the limit allows, the root counting as depth one.
    pub async fn validate(&self, org_id: &str, candidate_parent: &str) -> ServiceResult<()> {
        if candidate_parent == org_id {
            return Err(HierarchyError::CycleDetected {
                org_id: org_id.to_string(),
            }
            .into());
        }

        let mut visited = HashSet::new();
        visited.insert(org_id.to_string());

        let mut current = candidate_parent.to_string();
        let mut ancestors = 0usize;

        loop {
            if !visited.insert(current.clone()) {
                return Err(HierarchyError::CycleDetected {
                    org_id: org_id.to_string(),
                }
                .into());
            }

            ancestors += 1;
            if ancestors >= self.max_depth {
                return Err(HierarchyError::DepthExceeded {
                    max_depth: self.max_depth,
                }
                .into());
            }

            let doc = match self.store.get(ORGANIZATIONS, &current).await {
                Ok(doc) => doc,
                Err(StoreError::NotFound { .. }) => {
                    return Err(HierarchyError::ParentNotFound(current).into());
                }
                Err(other) => return Err(other.into()),
            };

            if doc.get("status").and_then(Value::as_str) == Some("deleted") {
                return Err(HierarchyError::ParentNotFound(current).into());
            }

            match doc.get("parent_org_id").and_then(Value::as_str) {
                Some(parent) => current = parent.to_string(),
                None => return Ok(()),
            }
        }
    }
}
