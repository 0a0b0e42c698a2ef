//! Organization settings
//!
//! Settings are stored one-to-one with an organization and are composed of
//! independently-updatable sub-documents. Each sub-document carries its own
//! system defaults so a missing document (or a missing field within one) can
//! always be materialized without guesswork.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Billing cycle for an organization.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    /// Billed every month
    #[default]
    Monthly,

    /// Billed every three months
    Quarterly,

    /// Billed once a year
    Annual,
}

impl BillingCycle {
    /// Parse a billing cycle from its wire string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "monthly" => Some(Self::Monthly),
            "quarterly" => Some(Self::Quarterly),
            "annual" => Some(Self::Annual),
            _ => None,
        }
    }

    /// Wire string for this cycle.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Annual => "annual",
        }
    }
}

impl fmt::Display for BillingCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Billing configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BillingSettings {
    /// Invoice recipient address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Billing cycle
    #[serde(default)]
    pub cycle: BillingCycle,

    /// Stored payment method reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method_id: Option<String>,

    /// Tax identifier for invoicing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,
}

/// Notification preferences. Everything defaults to on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationSettings {
    /// Invoice and payment alerts
    #[serde(default = "default_true")]
    pub billing_alerts: bool,

    /// Quota consumption alerts
    #[serde(default = "default_true")]
    pub usage_alerts: bool,

    /// Security-relevant activity alerts
    #[serde(default = "default_true")]
    pub security_alerts: bool,

    /// Platform maintenance and release notices
    #[serde(default = "default_true")]
    pub system_updates: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            billing_alerts: true,
            usage_alerts: true,
            security_alerts: true,
            system_updates: true,
        }
    }
}

/// Feature toggles. Only API access is on by default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureSettings {
    /// Programmatic API access
    #[serde(default = "default_true")]
    pub api_access: bool,

    /// Advanced analytics dashboards
    #[serde(default)]
    pub advanced_analytics: bool,

    /// Custom third-party integrations
    #[serde(default)]
    pub custom_integrations: bool,

    /// Priority support queue
    #[serde(default)]
    pub priority_support: bool,
}

impl Default for FeatureSettings {
    fn default() -> Self {
        Self {
            api_access: true,
            advanced_analytics: false,
            custom_integrations: false,
            priority_support: false,
        }
    }
}

/// Security policy settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SecuritySettings {
    /// Require two-factor authentication for all members
    #[serde(default)]
    pub require_2fa: bool,

    /// Session timeout in seconds
    #[serde(default = "default_session_timeout")]
    pub session_timeout_secs: u32,

    /// Allowed email domains for membership (empty = all allowed)
    #[serde(default)]
    pub allowed_domains: Vec<String>,

    /// IP allowlist (empty = all allowed)
    #[serde(default)]
    pub ip_allowlist: Vec<String>,
}

fn default_session_timeout() -> u32 {
    3600
}

fn default_true() -> bool {
    true
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            require_2fa: false,
            session_timeout_secs: default_session_timeout(),
            allowed_domains: Vec::new(),
            ip_allowlist: Vec::new(),
        }
    }
}

/// Display and localization preferences.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PreferenceSettings {
    /// UI theme
    #[serde(default = "default_theme")]
    pub theme: String,

    /// IANA timezone name
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Date format string
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// ISO 639-1 language code
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_theme() -> String {
    "light".to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_date_format() -> String {
    "YYYY-MM-DD".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

impl Default for PreferenceSettings {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            timezone: default_timezone(),
            date_format: default_date_format(),
            language: default_language(),
        }
    }
}

/// Settings document for one organization.
///
/// # Examples
///
/// ```
/// use org_domain::OrganizationSettings;
///
/// let settings = OrganizationSettings::defaults("org_1a2b3c4d");
/// assert_eq!(settings.billing.cycle.as_str(), "monthly");
/// assert!(settings.notifications.usage_alerts);
/// assert!(settings.features.api_access);
/// assert!(!settings.features.priority_support);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrganizationSettings {
    /// Owning organization
    pub org_id: String,

    /// Billing configuration
    #[serde(default)]
    pub billing: BillingSettings,

    /// Notification preferences
    #[serde(default)]
    pub notifications: NotificationSettings,

    /// Feature toggles
    #[serde(default)]
    pub features: FeatureSettings,

    /// Security policy
    #[serde(default)]
    pub security: SecuritySettings,

    /// Display preferences
    #[serde(default)]
    pub preferences: PreferenceSettings,

    /// Per-integration configuration blobs
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub integrations: HashMap<String, serde_json::Value>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl OrganizationSettings {
    /// Build the system-default settings document for an organization.
    pub fn defaults(org_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            org_id: org_id.into(),
            billing: BillingSettings::default(),
            notifications: NotificationSettings::default(),
            features: FeatureSettings::default(),
            security: SecuritySettings::default(),
            preferences: PreferenceSettings::default(),
            integrations: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }
}
