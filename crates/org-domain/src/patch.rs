//! Merge-patch engine
//!
//! Partial updates for settings and limits. A patch only touches fields it
//! explicitly names: a missing key leaves the stored value alone, an
//! explicit `null` clears it, and unknown keys are rejected at decode rather
//! than silently dropped. Merging is pure; callers decide what to do with
//! the merged document.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;

use crate::limits::OrganizationLimits;
use crate::settings::{BillingCycle, OrganizationSettings};

/// A three-state patch field: missing key, explicit null, or a value.
///
/// Deserialization maps a missing key to `Absent` (via `Default`) and an
/// explicit JSON `null` to `Clear`, preserving the distinction a plain
/// `Option` would lose.
///
/// # Examples
///
/// ```
/// use org_domain::Patch;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Probe {
///     #[serde(default)]
///     email: Patch<String>,
/// }
///
/// let p: Probe = serde_json::from_str("{}").unwrap();
/// assert_eq!(p.email, Patch::Absent);
///
/// let p: Probe = serde_json::from_str(r#"{"email":null}"#).unwrap();
/// assert_eq!(p.email, Patch::Clear);
///
/// let p: Probe = serde_json::from_str(r#"{"email":"a@b.io"}"#).unwrap();
/// assert_eq!(p.email, Patch::Set("a@b.io".to_string()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch<T> {
    /// Key not present; leave the stored value untouched
    Absent,
    /// Key present with `null`; clear the stored value
    Clear,
    /// Key present with a value; replace the stored value
    Set(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Absent
    }
}

impl<T> Patch<T> {
    /// Whether the key was missing from the patch.
    pub fn is_absent(&self) -> bool {
        matches!(self, Patch::Absent)
    }

    /// Apply to an optional slot: `Clear` empties it, `Set` fills it.
    pub fn apply_to(self, slot: &mut Option<T>) {
        match self {
            Patch::Absent => {}
            Patch::Clear => *slot = None,
            Patch::Set(v) => *slot = Some(v),
        }
    }

    /// Apply to a required slot: `Clear` restores the given reset value.
    pub fn apply_or_reset(self, slot: &mut T, reset: T) {
        match self {
            Patch::Absent => {}
            Patch::Clear => *slot = reset,
            Patch::Set(v) => *slot = v,
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(v) => Patch::Set(v),
            None => Patch::Clear,
        })
    }
}

impl<T: Serialize> Serialize for Patch<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Patch::Set(v) => v.serialize(serializer),
            _ => serializer.serialize_none(),
        }
    }
}

/// Deserializer for fields that may be omitted but never set to `null`.
pub(crate) fn reject_null<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Option::<T>::deserialize(deserializer)? {
        Some(v) => Ok(Some(v)),
        None => Err(serde::de::Error::custom("field does not accept null")),
    }
}

/// Partial update for [`crate::settings::BillingSettings`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BillingPatch {
    #[serde(skip_serializing_if = "Patch::is_absent")]
    pub email: Patch<String>,
    #[serde(
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub cycle: Option<BillingCycle>,
    #[serde(skip_serializing_if = "Patch::is_absent")]
    pub payment_method_id: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_absent")]
    pub tax_id: Patch<String>,
}

/// Partial update for [`crate::settings::NotificationSettings`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct NotificationsPatch {
    #[serde(
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub billing_alerts: Option<bool>,
    #[serde(
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub usage_alerts: Option<bool>,
    #[serde(
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub security_alerts: Option<bool>,
    #[serde(
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub system_updates: Option<bool>,
}

/// Partial update for [`crate::settings::FeatureSettings`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FeaturesPatch {
    #[serde(
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub api_access: Option<bool>,
    #[serde(
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub advanced_analytics: Option<bool>,
    #[serde(
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub custom_integrations: Option<bool>,
    #[serde(
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub priority_support: Option<bool>,
}

/// Partial update for [`crate::settings::SecuritySettings`].
///
/// `allowed_domains` and `ip_allowlist` replace the stored list wholesale;
/// an explicit `null` clears the list.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SecurityPatch {
    #[serde(
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub require_2fa: Option<bool>,
    #[serde(
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub session_timeout_secs: Option<u32>,
    #[serde(skip_serializing_if = "Patch::is_absent")]
    pub allowed_domains: Patch<Vec<String>>,
    #[serde(skip_serializing_if = "Patch::is_absent")]
    pub ip_allowlist: Patch<Vec<String>>,
}

/// Partial update for [`crate::settings::PreferenceSettings`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PreferencesPatch {
    #[serde(
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub theme: Option<String>,
    #[serde(
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub timezone: Option<String>,
    #[serde(
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub date_format: Option<String>,
    #[serde(
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub language: Option<String>,
}

/// Partial update for a settings document.
///
/// Sub-documents absent from the patch are left untouched. Within the
/// `integrations` map, a `null` value removes that key and any other value
/// replaces it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SettingsPatch {
    #[serde(
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub billing: Option<BillingPatch>,
    #[serde(
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub notifications: Option<NotificationsPatch>,
    #[serde(
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub features: Option<FeaturesPatch>,
    #[serde(
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub security: Option<SecurityPatch>,
    #[serde(
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub preferences: Option<PreferencesPatch>,
    #[serde(
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub integrations: Option<HashMap<String, Option<serde_json::Value>>>,
}

impl SettingsPatch {
    /// Names of the sub-documents this patch touches.
    pub fn touched(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.billing.is_some() {
            fields.push("billing");
        }
        if self.notifications.is_some() {
            fields.push("notifications");
        }
        if self.features.is_some() {
            fields.push("features");
        }
        if self.security.is_some() {
            fields.push("security");
        }
        if self.preferences.is_some() {
            fields.push("preferences");
        }
        if self.integrations.is_some() {
            fields.push("integrations");
        }
        fields
    }

    /// Whether the patch touches nothing.
    pub fn is_empty(&self) -> bool {
        self.touched().is_empty()
    }
}

/// Merge a settings patch into an existing document.
///
/// Pure: returns the merged document and leaves the input untouched. The
/// caller owns timestamp bumps and persistence.
pub fn merge_settings(
    current: &OrganizationSettings,
    patch: &SettingsPatch,
) -> OrganizationSettings {
    let mut next = current.clone();

    if let Some(billing) = &patch.billing {
        billing.email.clone().apply_to(&mut next.billing.email);
        if let Some(cycle) = billing.cycle {
            next.billing.cycle = cycle;
        }
        billing
            .payment_method_id
            .clone()
            .apply_to(&mut next.billing.payment_method_id);
        billing.tax_id.clone().apply_to(&mut next.billing.tax_id);
    }

    if let Some(notifications) = &patch.notifications {
        if let Some(v) = notifications.billing_alerts {
            next.notifications.billing_alerts = v;
        }
        if let Some(v) = notifications.usage_alerts {
            next.notifications.usage_alerts = v;
        }
        if let Some(v) = notifications.security_alerts {
            next.notifications.security_alerts = v;
        }
        if let Some(v) = notifications.system_updates {
            next.notifications.system_updates = v;
        }
    }

    if let Some(features) = &patch.features {
        if let Some(v) = features.api_access {
            next.features.api_access = v;
        }
        if let Some(v) = features.advanced_analytics {
            next.features.advanced_analytics = v;
        }
        if let Some(v) = features.custom_integrations {
            next.features.custom_integrations = v;
        }
        if let Some(v) = features.priority_support {
            next.features.priority_support = v;
        }
    }

    if let Some(security) = &patch.security {
        if let Some(v) = security.require_2fa {
            next.security.require_2fa = v;
        }
        if let Some(v) = security.session_timeout_secs {
            next.security.session_timeout_secs = v;
        }
        security
            .allowed_domains
            .clone()
            .apply_or_reset(&mut next.security.allowed_domains, Vec::new());
        security
            .ip_allowlist
            .clone()
            .apply_or_reset(&mut next.security.ip_allowlist, Vec::new());
    }

    if let Some(preferences) = &patch.preferences {
        if let Some(v) = &preferences.theme {
            next.preferences.theme = v.clone();
        }
        if let Some(v) = &preferences.timezone {
            next.preferences.timezone = v.clone();
        }
        if let Some(v) = &preferences.date_format {
            next.preferences.date_format = v.clone();
        }
        if let Some(v) = &preferences.language {
            next.preferences.language = v.clone();
        }
    }

    if let Some(integrations) = &patch.integrations {
        for (key, value) in integrations {
            match value {
                Some(v) => {
                    next.integrations.insert(key.clone(), v.clone());
                }
                None => {
                    next.integrations.remove(key);
                }
            }
        }
    }

    next
}

/// Partial update for [`crate::limits::UserLimits`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct UsersLimitsPatch {
    #[serde(
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_users: Option<u32>,
    #[serde(
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_admin_users: Option<u32>,
}

/// Partial update for [`crate::limits::StorageLimits`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct StorageLimitsPatch {
    #[serde(
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_storage_bytes: Option<u64>,
}

/// Partial update for [`crate::limits::ApiRateLimits`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ApiRateLimitsPatch {
    #[serde(
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub calls_per_hour: Option<u32>,
    #[serde(
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub calls_per_day: Option<u32>,
}

/// Partial update for [`crate::limits::ResourceLimits`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ResourceLimitsPatch {
    #[serde(
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_projects: Option<u32>,
    #[serde(
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_integrations: Option<u32>,
    #[serde(
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_webhooks: Option<u32>,
}

/// Partial update for [`crate::limits::FeatureLimits`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FeatureLimitsPatch {
    #[serde(
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_custom_fields: Option<u32>,
    #[serde(
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_workflows: Option<u32>,
    #[serde(
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_reports: Option<u32>,
}

/// Partial update for [`crate::limits::BandwidthLimits`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct BandwidthLimitsPatch {
    #[serde(
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub monthly_bytes: Option<u64>,
}

/// Partial update for [`crate::limits::FileLimits`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FileLimitsPatch {
    #[serde(
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_file_size_bytes: Option<u64>,
}

/// Partial update for [`crate::limits::RetentionLimits`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RetentionLimitsPatch {
    #[serde(
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub data_days: Option<u32>,
    #[serde(
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub backup_days: Option<u32>,
}

/// Partial update for a limits document.
///
/// Within the `custom` map, a `null` value removes that quota and a number
/// replaces it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsPatch {
    #[serde(
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub users: Option<UsersLimitsPatch>,
    #[serde(
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub storage: Option<StorageLimitsPatch>,
    #[serde(
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub api_rate: Option<ApiRateLimitsPatch>,
    #[serde(
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub resources: Option<ResourceLimitsPatch>,
    #[serde(
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub features: Option<FeatureLimitsPatch>,
    #[serde(
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub bandwidth: Option<BandwidthLimitsPatch>,
    #[serde(
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub files: Option<FileLimitsPatch>,
    #[serde(
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub retention: Option<RetentionLimitsPatch>,
    #[serde(
        deserialize_with = "reject_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub custom: Option<HashMap<String, Option<u64>>>,
}

impl LimitsPatch {
    /// Names of the quota groups this patch touches.
    pub fn touched(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.users.is_some() {
            fields.push("users");
        }
        if self.storage.is_some() {
            fields.push("storage");
        }
        if self.api_rate.is_some() {
            fields.push("api_rate");
        }
        if self.resources.is_some() {
            fields.push("resources");
        }
        if self.features.is_some() {
            fields.push("features");
        }
        if self.bandwidth.is_some() {
            fields.push("bandwidth");
        }
        if self.files.is_some() {
            fields.push("files");
        }
        if self.retention.is_some() {
            fields.push("retention");
        }
        if self.custom.is_some() {
            fields.push("custom");
        }
        fields
    }

    /// Whether the patch touches nothing.
    pub fn is_empty(&self) -> bool {
        self.touched().is_empty()
    }
}

/// Merge a limits patch into an existing document.
///
/// Pure; range validation runs on the merged result via
/// [`OrganizationLimits::validate`].
pub fn merge_limits(current: &OrganizationLimits, patch: &LimitsPatch) -> OrganizationLimits {
    let mut next = current.clone();

    if let Some(users) = &patch.users {
        if let Some(v) = users.max_users {
            next.users.max_users = v;
        }
        if let Some(v) = users.max_admin_users {
            next.users.max_admin_users = v;
        }
    }
    if let Some(storage) = &patch.storage {
        if let Some(v) = storage.max_storage_bytes {
            next.storage.max_storage_bytes = v;
        }
    }
    if let Some(api_rate) = &patch.api_rate {
        if let Some(v) = api_rate.calls_per_hour {
            next.api_rate.calls_per_hour = v;
        }
        if let Some(v) = api_rate.calls_per_day {
            next.api_rate.calls_per_day = v;
        }
    }
    if let Some(resources) = &patch.resources {
        if let Some(v) = resources.max_projects {
            next.resources.max_projects = v;
        }
        if let Some(v) = resources.max_integrations {
            next.resources.max_integrations = v;
        }
        if let Some(v) = resources.max_webhooks {
            next.resources.max_webhooks = v;
        }
    }
    if let Some(features) = &patch.features {
        if let Some(v) = features.max_custom_fields {
            next.features.max_custom_fields = v;
        }
        if let Some(v) = features.max_workflows {
            next.features.max_workflows = v;
        }
        if let Some(v) = features.max_reports {
            next.features.max_reports = v;
        }
    }
    if let Some(bandwidth) = &patch.bandwidth {
        if let Some(v) = bandwidth.monthly_bytes {
            next.bandwidth.monthly_bytes = v;
        }
    }
    if let Some(files) = &patch.files {
        if let Some(v) = files.max_file_size_bytes {
            next.files.max_file_size_bytes = v;
        }
    }
    if let Some(retention) = &patch.retention {
        if let Some(v) = retention.data_days {
            next.retention.data_days = v;
        }
        if let Some(v) = retention.backup_days {
            next.retention.backup_days = v;
        }
    }
    if let Some(custom) = &patch.custom {
        for (key, value) in custom {
            match value {
                Some(v) => {
                    next.custom.insert(key.clone(), *v);
                }
                None => {
                    next.custom.remove(key);
                }
            }
        }
    }

    next
}
