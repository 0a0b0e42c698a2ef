//! # org-domain
//!
//! Domain model for the org-service: organization entities, their settings
//! and limits documents, module permissions, strictly-decoded request types,
//! and the merge-patch engine for partial updates.
//!
//! ## Overview
//!
//! - [`Organization`]: the authoritative tenant record with lifecycle
//!   status and optional parent reference
//! - [`OrganizationSettings`] / [`OrganizationLimits`]: one-to-one
//!   documents composed of independently-updatable sub-documents, each with
//!   system defaults
//! - [`ModulePermissions`]: which platform modules an organization can see
//! - [`Patch`] and the `*Patch` types: merge-patch semantics where a
//!   missing key means "leave alone", an explicit `null` means "clear",
//!   and unknown keys are rejected at decode
//! - Request types for every bus operation, validated before business
//!   logic runs
//!
//! ## Usage
//!
//! ```
//! use org_domain::{merge_settings, OrganizationSettings, SettingsPatch};
//!
//! let current = OrganizationSettings::defaults("org_1a2b3c4d");
//! let patch: SettingsPatch = serde_json::from_str(
//!     r#"{"billing": {"email": "ap@acme.io"}}"#,
//! ).unwrap();
//!
//! let merged = merge_settings(&current, &patch);
//! assert_eq!(merged.billing.email.as_deref(), Some("ap@acme.io"));
//! assert_eq!(merged.billing.cycle, current.billing.cycle);
//! ```

pub mod error;
pub mod limits;
pub mod module;
pub mod organization;
pub mod patch;
pub mod request;
pub mod settings;

pub use error::{DomainError, DomainResult};
pub use limits::{
    ApiRateLimits, BandwidthLimits, FeatureLimits, FileLimits, OrganizationLimits,
    ResourceLimits, RetentionLimits, StorageLimits, UserLimits,
};
pub use module::{
    all_module_keys, is_known_module, ModuleDescriptor, ModulePermissions, MODULE_CATALOG,
};
pub use organization::{generate_org_id, normalize_tags, Organization, OrganizationStatus};
pub use patch::{merge_limits, merge_settings, LimitsPatch, Patch, SettingsPatch};
pub use request::{
    validate_name, BulkUpdateModulesRequest, CreateOrganizationRequest, DeleteOrganizationRequest,
    DeletePolicy, GetLimitsRequest, GetModulesRequest, GetOrganizationRequest, GetSettingsRequest,
    ListOrganizationsRequest, ModuleStatusRequest, SearchOrganizationsRequest, SortKey, SortOrder,
    ToggleModuleRequest, UpdateLimitsRequest, UpdateOrganizationRequest, UpdateSettingsRequest,
};
pub use settings::{
    BillingCycle, BillingSettings, FeatureSettings, NotificationSettings, OrganizationSettings,
    PreferenceSettings, SecuritySettings,
};
