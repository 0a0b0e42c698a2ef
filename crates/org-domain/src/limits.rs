//! Organization quota limits
//!
//! Limits are stored one-to-one with an organization and grouped into
//! independently-updatable quota groups. This service records limits; it
//! does not track live usage against them, so lowering a limit below current
//! consumption is accepted as long as the value itself is well-formed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{DomainError, DomainResult};

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;
const GIB: u64 = 1024 * MIB;

/// Member count quotas.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserLimits {
    /// Maximum members
    #[serde(default = "default_max_users")]
    pub max_users: u32,

    /// Maximum members with the admin role
    #[serde(default = "default_max_admin_users")]
    pub max_admin_users: u32,
}

fn default_max_users() -> u32 {
    100
}

fn default_max_admin_users() -> u32 {
    10
}

impl Default for UserLimits {
    fn default() -> Self {
        Self {
            max_users: default_max_users(),
            max_admin_users: default_max_admin_users(),
        }
    }
}

/// Storage quotas.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageLimits {
    /// Total storage in bytes
    #[serde(default = "default_max_storage_bytes")]
    pub max_storage_bytes: u64,
}

fn default_max_storage_bytes() -> u64 {
    10 * GIB
}

impl Default for StorageLimits {
    fn default() -> Self {
        Self {
            max_storage_bytes: default_max_storage_bytes(),
        }
    }
}

/// API request rate quotas.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiRateLimits {
    /// Requests per hour
    #[serde(default = "default_calls_per_hour")]
    pub calls_per_hour: u32,

    /// Requests per day
    #[serde(default = "default_calls_per_day")]
    pub calls_per_day: u32,
}

fn default_calls_per_hour() -> u32 {
    1000
}

fn default_calls_per_day() -> u32 {
    10_000
}

impl Default for ApiRateLimits {
    fn default() -> Self {
        Self {
            calls_per_hour: default_calls_per_hour(),
            calls_per_day: default_calls_per_day(),
        }
    }
}

/// Countable resource quotas.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceLimits {
    /// Maximum projects
    #[serde(default = "default_max_projects")]
    pub max_projects: u32,

    /// Maximum configured integrations
    #[serde(default = "default_max_integrations")]
    pub max_integrations: u32,

    /// Maximum registered webhooks
    #[serde(default = "default_max_webhooks")]
    pub max_webhooks: u32,
}

fn default_max_projects() -> u32 {
    50
}

fn default_max_integrations() -> u32 {
    10
}

fn default_max_webhooks() -> u32 {
    20
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_projects: default_max_projects(),
            max_integrations: default_max_integrations(),
            max_webhooks: default_max_webhooks(),
        }
    }
}

/// Feature usage quotas.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeatureLimits {
    /// Maximum custom fields
    #[serde(default = "default_max_custom_fields")]
    pub max_custom_fields: u32,

    /// Maximum workflows
    #[serde(default = "default_max_workflows")]
    pub max_workflows: u32,

    /// Maximum saved reports
    #[serde(default = "default_max_reports")]
    pub max_reports: u32,
}

fn default_max_custom_fields() -> u32 {
    100
}

fn default_max_workflows() -> u32 {
    25
}

fn default_max_reports() -> u32 {
    50
}

impl Default for FeatureLimits {
    fn default() -> Self {
        Self {
            max_custom_fields: default_max_custom_fields(),
            max_workflows: default_max_workflows(),
            max_reports: default_max_reports(),
        }
    }
}

/// Bandwidth quotas.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BandwidthLimits {
    /// Monthly transfer in bytes
    #[serde(default = "default_monthly_bytes")]
    pub monthly_bytes: u64,
}

fn default_monthly_bytes() -> u64 {
    100 * GIB
}

impl Default for BandwidthLimits {
    fn default() -> Self {
        Self {
            monthly_bytes: default_monthly_bytes(),
        }
    }
}

/// File size quotas.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileLimits {
    /// Maximum single upload in bytes
    #[serde(default = "default_max_file_size_bytes")]
    pub max_file_size_bytes: u64,
}

fn default_max_file_size_bytes() -> u64 {
    100 * MIB
}

impl Default for FileLimits {
    fn default() -> Self {
        Self {
            max_file_size_bytes: default_max_file_size_bytes(),
        }
    }
}

/// Data retention quotas. Both values must be at least one day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetentionLimits {
    /// Days operational data is retained
    #[serde(default = "default_data_days")]
    pub data_days: u32,

    /// Days backups are retained
    #[serde(default = "default_backup_days")]
    pub backup_days: u32,
}

fn default_data_days() -> u32 {
    365
}

fn default_backup_days() -> u32 {
    90
}

impl Default for RetentionLimits {
    fn default() -> Self {
        Self {
            data_days: default_data_days(),
            backup_days: default_backup_days(),
        }
    }
}

/// Limits document for one organization.
///
/// # Examples
///
/// ```
/// use org_domain::OrganizationLimits;
///
/// let limits = OrganizationLimits::defaults("org_1a2b3c4d");
/// assert_eq!(limits.users.max_users, 100);
/// assert_eq!(limits.storage.max_storage_bytes, 10 * 1024 * 1024 * 1024);
/// assert_eq!(limits.retention.data_days, 365);
/// assert!(limits.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrganizationLimits {
    /// Owning organization
    pub org_id: String,

    /// Member count quotas
    #[serde(default)]
    pub users: UserLimits,

    /// Storage quotas
    #[serde(default)]
    pub storage: StorageLimits,

    /// API rate quotas
    #[serde(default)]
    pub api_rate: ApiRateLimits,

    /// Countable resource quotas
    #[serde(default)]
    pub resources: ResourceLimits,

    /// Feature usage quotas
    #[serde(default)]
    pub features: FeatureLimits,

    /// Bandwidth quotas
    #[serde(default)]
    pub bandwidth: BandwidthLimits,

    /// File size quotas
    #[serde(default)]
    pub files: FileLimits,

    /// Retention quotas
    #[serde(default)]
    pub retention: RetentionLimits,

    /// Named custom quotas
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub custom: HashMap<String, u64>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl OrganizationLimits {
    /// Build the system-default limits document for an organization.
    pub fn defaults(org_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            org_id: org_id.into(),
            users: UserLimits::default(),
            storage: StorageLimits::default(),
            api_rate: ApiRateLimits::default(),
            resources: ResourceLimits::default(),
            features: FeatureLimits::default(),
            bandwidth: BandwidthLimits::default(),
            files: FileLimits::default(),
            retention: RetentionLimits::default(),
            custom: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Range-validate the document.
    ///
    /// Unsigned types already rule out negative values; this checks the few
    /// fields with a stricter lower bound.
    pub fn validate(&self) -> DomainResult<()> {
        if self.users.max_users == 0 {
            return Err(DomainError::invalid_field(
                "users.max_users",
                "must be at least 1",
            ));
        }
        if self.retention.data_days == 0 {
            return Err(DomainError::invalid_field(
                "retention.data_days",
                "must be at least 1",
            ));
        }
        if self.retention.backup_days == 0 {
            return Err(DomainError::invalid_field(
                "retention.backup_days",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}
