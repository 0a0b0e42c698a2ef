//! Request types decoded at the dispatch boundary
//!
//! Every operation has its own request struct, decoded strictly
//! (`deny_unknown_fields`) before any business logic runs. Field-level
//! bounds live here too, next to the types they protect.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{DomainError, DomainResult};
use crate::organization::{normalize_tags, Organization, OrganizationStatus};
use crate::patch::{reject_null, LimitsPatch, Patch, SettingsPatch};

/// Validate an organization name and return its canonical lowercase form.
///
/// Names are 2-100 characters of ASCII alphanumerics plus `-`, `_` and `.`,
/// compared case-insensitively.
///
/// # Examples
///
/// ```
/// use org_domain::request::validate_name;
///
/// assert_eq!(validate_name("Acme-Corp").unwrap(), "acme-corp");
/// assert!(validate_name("a").is_err());
/// assert!(validate_name("acme corp").is_err());
/// ```
pub fn validate_name(name: &str) -> DomainResult<String> {
    let trimmed = name.trim();
    if trimmed.len() < 2 || trimmed.len() > 100 {
        return Err(DomainError::invalid_field(
            "name",
            "must be between 2 and 100 characters",
        ));
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(DomainError::invalid_field(
            "name",
            "may only contain alphanumerics, '-', '_' and '.'",
        ));
    }
    Ok(trimmed.to_lowercase())
}

fn validate_display_name(display_name: &str) -> DomainResult<()> {
    let len = display_name.trim().len();
    if !(2..=200).contains(&len) {
        return Err(DomainError::invalid_field(
            "display_name",
            "must be between 2 and 200 characters",
        ));
    }
    Ok(())
}

fn validate_description(description: &str) -> DomainResult<()> {
    if description.len() > 1000 {
        return Err(DomainError::invalid_field(
            "description",
            "must be at most 1000 characters",
        ));
    }
    Ok(())
}

/// Create a new organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateOrganizationRequest {
    /// Unique name (canonicalized to lowercase)
    pub name: String,
    /// Display name
    pub display_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub address: Option<HashMap<String, String>>,
    /// Optional parent organization
    #[serde(default)]
    pub parent_org_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    /// Owning user
    pub owner_id: String,
}

impl CreateOrganizationRequest {
    /// Validate field bounds and return the canonical name.
    pub fn validate(&self) -> DomainResult<String> {
        let name = validate_name(&self.name)?;
        validate_display_name(&self.display_name)?;
        if let Some(description) = &self.description {
            validate_description(description)?;
        }
        if self.owner_id.trim().is_empty() {
            return Err(DomainError::invalid_field("owner_id", "must not be empty"));
        }
        Ok(name)
    }

    /// Build the organization this request describes.
    ///
    /// `canonical_name` comes from [`Self::validate`]; the entity gets a
    /// fresh `org_id` and timestamps.
    pub fn into_organization(self, canonical_name: String) -> Organization {
        let mut org = Organization::new(canonical_name, self.display_name, self.owner_id);
        org.description = self.description;
        org.email = self.email;
        org.phone = self.phone;
        org.website = self.website;
        org.address = self.address;
        org.parent_org_id = self.parent_org_id;
        org.tags = normalize_tags(self.tags);
        org.metadata = self.metadata;
        org
    }
}

/// Fetch one organization by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GetOrganizationRequest {
    pub org_id: String,
}

/// Update mutable organization fields.
///
/// Absent fields are untouched; `description`, contact fields, `address` and
/// `parent_org_id` accept an explicit `null` to clear. Non-clearable fields
/// such as `display_name` and `status` reject `null` outright. `name`,
/// `org_id` and `owner_id` are immutable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateOrganizationRequest {
    pub org_id: String,
    #[serde(
        default,
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub description: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub email: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub phone: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub website: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub address: Patch<HashMap<String, String>>,
    #[serde(
        default,
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<OrganizationStatus>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub parent_org_id: Patch<String>,
    #[serde(
        default,
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub tags: Option<Vec<String>>,
    #[serde(
        default,
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl UpdateOrganizationRequest {
    /// Validate field bounds.
    ///
    /// The `deleted` status is reserved for the delete operation and is
    /// rejected here.
    pub fn validate(&self) -> DomainResult<()> {
        if let Some(display_name) = &self.display_name {
            validate_display_name(display_name)?;
        }
        if let Patch::Set(description) = &self.description {
            validate_description(description)?;
        }
        if let Some(status) = self.status {
            if status.is_deleted() {
                return Err(DomainError::invalid_field(
                    "status",
                    "cannot be set to deleted; use the delete operation",
                ));
            }
        }
        if let Patch::Set(parent) = &self.parent_org_id {
            if parent.trim().is_empty() {
                return Err(DomainError::invalid_field(
                    "parent_org_id",
                    "must not be empty",
                ));
            }
        }
        Ok(())
    }

    /// Apply this update to an organization, returning the updated entity
    /// and the names of the fields that were present in the request.
    ///
    /// Pure apart from the `updated_at` bump; hierarchy checks on a parent
    /// change are the caller's job.
    pub fn apply_to(&self, current: &Organization) -> (Organization, Vec<&'static str>) {
        let mut next = current.clone();
        let mut updated = Vec::new();

        if let Some(display_name) = &self.display_name {
            next.display_name = display_name.clone();
            updated.push("display_name");
        }
        if !self.description.is_absent() {
            self.description.clone().apply_to(&mut next.description);
            updated.push("description");
        }
        if !self.email.is_absent() {
            self.email.clone().apply_to(&mut next.email);
            updated.push("email");
        }
        if !self.phone.is_absent() {
            self.phone.clone().apply_to(&mut next.phone);
            updated.push("phone");
        }
        if !self.website.is_absent() {
            self.website.clone().apply_to(&mut next.website);
            updated.push("website");
        }
        if !self.address.is_absent() {
            self.address.clone().apply_to(&mut next.address);
            updated.push("address");
        }
        if let Some(status) = self.status {
            next.status = status;
            updated.push("status");
        }
        if !self.parent_org_id.is_absent() {
            self.parent_org_id
                .clone()
                .apply_to(&mut next.parent_org_id);
            updated.push("parent_org_id");
        }
        if let Some(tags) = &self.tags {
            next.tags = normalize_tags(tags.clone());
            updated.push("tags");
        }
        if let Some(metadata) = &self.metadata {
            next.metadata = metadata.clone();
            updated.push("metadata");
        }

        if !updated.is_empty() {
            next.touch();
        }
        (next, updated)
    }
}

/// Policy governing what happens to child organizations on delete.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeletePolicy {
    /// Refuse to delete while children exist
    #[default]
    Block,
    /// Delete children too, depth first
    Cascade,
    /// Detach children to root before deleting
    Orphan,
}

impl DeletePolicy {
    /// Wire string for this policy.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::Cascade => "cascade",
            Self::Orphan => "orphan",
        }
    }
}

/// Delete an organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteOrganizationRequest {
    pub org_id: String,
    /// What to do with child organizations
    #[serde(default)]
    pub policy: DeletePolicy,
}

/// Sortable organization fields.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    CreatedAt,
    UpdatedAt,
    Name,
    DisplayName,
}

impl SortKey {
    /// Document field name for this key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::Name => "name",
            Self::DisplayName => "display_name",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    20
}

/// List organizations with filters and pagination.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListOrganizationsRequest {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Filter by status; deleted organizations are excluded unless
    /// `deleted` is requested explicitly
    #[serde(default)]
    pub status: Option<OrganizationStatus>,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub parent_org_id: Option<String>,
    /// Match organizations carrying any of these tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// Free-text search over name, display_name and description
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub sort_by: SortKey,
    #[serde(default)]
    pub sort_order: SortOrder,
}

impl Default for ListOrganizationsRequest {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
            status: None,
            owner_id: None,
            parent_org_id: None,
            tags: Vec::new(),
            search: None,
            sort_by: SortKey::default(),
            sort_order: SortOrder::default(),
        }
    }
}

/// Free-text search over organizations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchOrganizationsRequest {
    /// Search text (required, non-empty)
    pub query: String,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub sort_by: SortKey,
    #[serde(default)]
    pub sort_order: SortOrder,
}

/// Fetch the settings document for an organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GetSettingsRequest {
    pub org_id: String,
}

/// Merge-patch the settings document for an organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateSettingsRequest {
    pub org_id: String,
    pub settings: SettingsPatch,
}

/// Fetch the limits document for an organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GetLimitsRequest {
    pub org_id: String,
}

/// Merge-patch the limits document for an organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateLimitsRequest {
    pub org_id: String,
    pub limits: LimitsPatch,
}

/// Fetch the enabled modules for an organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GetModulesRequest {
    pub org_id: String,
}

/// Enable or disable one module for an organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToggleModuleRequest {
    pub org_id: String,
    /// Catalog module key
    pub module: String,
    pub enabled: bool,
    #[serde(default)]
    pub updated_by: Option<String>,
}

/// Replace the enabled module set for an organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BulkUpdateModulesRequest {
    pub org_id: String,
    /// Complete new enabled set (validated against the catalog)
    pub modules: Vec<String>,
    #[serde(default)]
    pub updated_by: Option<String>,
}

/// Fetch the module catalog annotated with per-org enabled flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleStatusRequest {
    pub org_id: String,
}
