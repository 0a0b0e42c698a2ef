//! Organization entity
//!
//! This module provides the core `Organization` type: the authoritative
//! record for a tenant organization, including its lifecycle status,
//! optional position in the organization hierarchy, and free-form metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Lifecycle status of an organization.
///
/// `Deleted` is the terminal marker used by logical deletion; it is never
/// accepted from create or update requests and is only set by the delete
/// operation itself.
///
/// # Examples
///
/// ```
/// use org_domain::OrganizationStatus;
///
/// let status = OrganizationStatus::parse("suspended").unwrap();
/// assert_eq!(status, OrganizationStatus::Suspended);
/// assert_eq!(status.as_str(), "suspended");
/// assert!(!status.is_deleted());
/// ```
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OrganizationStatus {
    /// Fully operational
    #[default]
    Active,

    /// Deactivated by an administrator
    Inactive,

    /// Suspended (e.g. billing or policy hold)
    Suspended,

    /// Created but not yet activated
    Pending,

    /// Logically deleted; terminal
    Deleted,
}

impl OrganizationStatus {
    /// Parse a status from its wire string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            "suspended" => Some(Self::Suspended),
            "pending" => Some(Self::Pending),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }

    /// Wire string for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Suspended => "suspended",
            Self::Pending => "pending",
            Self::Deleted => "deleted",
        }
    }

    /// Whether this is the terminal deleted marker.
    pub fn is_deleted(&self) -> bool {
        matches!(self, Self::Deleted)
    }
}

impl fmt::Display for OrganizationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An organization: the root entity for multi-tenant resource grouping.
///
/// Organizations own their settings, limits, and module permissions, and may
/// reference a parent organization to form an acyclic hierarchy of bounded
/// depth.
///
/// # Examples
///
/// ```
/// use org_domain::Organization;
///
/// let org = Organization::new("acme-corp", "Acme Corp", "user_12345");
/// assert!(org.org_id.starts_with("org_"));
/// assert_eq!(org.name, "acme-corp");
/// assert!(org.is_active());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Organization {
    /// Unique identifier, immutable once assigned (`org_` + 8 hex chars)
    pub org_id: String,

    /// Canonical lowercase name, unique across non-deleted organizations
    pub name: String,

    /// Human-readable display name
    pub display_name: String,

    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Contact email
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Contact phone
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    /// Public website URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,

    /// Postal address components (free-form keys)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<HashMap<String, String>>,

    /// Lifecycle status
    #[serde(default)]
    pub status: OrganizationStatus,

    /// Optional parent organization reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_org_id: Option<String>,

    /// Classification tags (deduplicated set)
    #[serde(default)]
    pub tags: Vec<String>,

    /// Free-form metadata
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,

    /// User who owns this organization
    pub owner_id: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Organization {
    /// Create a new organization with a generated `org_id` and active status.
    ///
    /// The caller is expected to pass an already-canonicalized `name`
    /// (see [`crate::request::validate_name`]).
    pub fn new(
        name: impl Into<String>,
        display_name: impl Into<String>,
        owner_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            org_id: generate_org_id(),
            name: name.into(),
            display_name: display_name.into(),
            description: None,
            email: None,
            phone: None,
            website: None,
            address: None,
            status: OrganizationStatus::Active,
            parent_org_id: None,
            tags: Vec::new(),
            metadata: HashMap::new(),
            owner_id: owner_id.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the organization is in the active status.
    pub fn is_active(&self) -> bool {
        self.status == OrganizationStatus::Active
    }

    /// Whether the organization has been logically deleted.
    pub fn is_deleted(&self) -> bool {
        self.status.is_deleted()
    }

    /// Bump the update timestamp.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Generate a new organization identifier: `org_` plus 8 random hex chars.
pub fn generate_org_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("org_{}", &hex[..8])
}

/// Deduplicate tags while preserving first-seen order.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tags.into_iter()
        .filter(|t| !t.trim().is_empty() && seen.insert(t.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_organization() {
        let org = Organization::new("acme-corp", "Acme Corp", "user_12345");

        assert!(org.org_id.starts_with("org_"));
        assert_eq!(org.org_id.len(), 12);
        assert_eq!(org.name, "acme-corp");
        assert_eq!(org.display_name, "Acme Corp");
        assert_eq!(org.owner_id, "user_12345");
        assert_eq!(org.status, OrganizationStatus::Active);
        assert!(org.parent_org_id.is_none());
        assert_eq!(org.created_at, org.updated_at);
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = generate_org_id();
        let b = generate_org_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_status_parse_roundtrip() {
        for s in ["active", "inactive", "suspended", "pending", "deleted"] {
            let status = OrganizationStatus::parse(s).unwrap();
            assert_eq!(status.as_str(), s);
        }
        assert!(OrganizationStatus::parse("archived").is_none());
    }

    #[test]
    fn test_status_serde_lowercase() {
        let json = serde_json::to_string(&OrganizationStatus::Suspended).unwrap();
        assert_eq!(json, "\"suspended\"");

        let status: OrganizationStatus = serde_json::from_str("\"deleted\"").unwrap();
        assert!(status.is_deleted());
    }

    #[test]
    fn test_optional_fields_skipped_in_json() {
        let org = Organization::new("acme-corp", "Acme Corp", "user_12345");
        let value = serde_json::to_value(&org).unwrap();

        assert!(value.get("description").is_none());
        assert!(value.get("parent_org_id").is_none());
        assert_eq!(value["status"], "active");
    }

    #[test]
    fn test_normalize_tags_dedupes_preserving_order() {
        let tags = vec![
            "saas".to_string(),
            "beta".to_string(),
            "saas".to_string(),
            "".to_string(),
        ];
        assert_eq!(normalize_tags(tags), vec!["saas", "beta"]);
    }
}
