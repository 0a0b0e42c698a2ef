//! Platform module catalog and per-organization module permissions
//!
//! Modules are navigable feature areas of the platform. The catalog is
//! static; which modules an organization can see is stored per org and
//! defaults to everything enabled.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry in the static module catalog.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct ModuleDescriptor {
    /// Stable key used in permissions and requests
    pub key: &'static str,
    /// Display name
    pub name: &'static str,
    /// UI icon identifier
    pub icon: &'static str,
}

/// Static catalog of platform modules.
pub const MODULE_CATALOG: &[ModuleDescriptor] = &[
    ModuleDescriptor {
        key: "dashboard",
        name: "Dashboard",
        icon: "fa-tachometer-alt",
    },
    ModuleDescriptor {
        key: "members",
        name: "Members",
        icon: "fa-users",
    },
    ModuleDescriptor {
        key: "projects",
        name: "Projects",
        icon: "fa-folder-open",
    },
    ModuleDescriptor {
        key: "documents",
        name: "Documents",
        icon: "fa-file-alt",
    },
    ModuleDescriptor {
        key: "invoices",
        name: "Invoices",
        icon: "fa-file-invoice-dollar",
    },
    ModuleDescriptor {
        key: "payments",
        name: "Payments",
        icon: "fa-credit-card",
    },
    ModuleDescriptor {
        key: "integrations",
        name: "Integrations",
        icon: "fa-plug",
    },
    ModuleDescriptor {
        key: "webhooks",
        name: "Webhooks",
        icon: "fa-bolt",
    },
    ModuleDescriptor {
        key: "reports",
        name: "Reports",
        icon: "fa-chart-bar",
    },
    ModuleDescriptor {
        key: "analytics",
        name: "Analytics",
        icon: "fa-chart-line",
    },
    ModuleDescriptor {
        key: "workflows",
        name: "Workflows",
        icon: "fa-project-diagram",
    },
    ModuleDescriptor {
        key: "support",
        name: "Support",
        icon: "fa-headset",
    },
    ModuleDescriptor {
        key: "audit_log",
        name: "Audit Log",
        icon: "fa-clipboard-list",
    },
    ModuleDescriptor {
        key: "api_keys",
        name: "API Keys",
        icon: "fa-key",
    },
    ModuleDescriptor {
        key: "assistant",
        name: "Assistant",
        icon: "fa-robot",
    },
    ModuleDescriptor {
        key: "billing_admin",
        name: "Billing Admin",
        icon: "fa-cash-register",
    },
];

/// Whether a key names a catalog module.
pub fn is_known_module(key: &str) -> bool {
    MODULE_CATALOG.iter().any(|m| m.key == key)
}

/// All catalog keys, in catalog order.
pub fn all_module_keys() -> Vec<String> {
    MODULE_CATALOG.iter().map(|m| m.key.to_string()).collect()
}

/// Per-organization module permissions.
///
/// # Examples
///
/// ```
/// use org_domain::ModulePermissions;
///
/// let perms = ModulePermissions::defaults("org_1a2b3c4d");
/// assert!(perms.is_enabled("dashboard"));
/// assert!(perms.is_enabled("reports"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModulePermissions {
    /// Owning organization
    pub org_id: String,

    /// Enabled catalog keys, in catalog order
    #[serde(default)]
    pub enabled_modules: Vec<String>,

    /// Who last changed the set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl ModulePermissions {
    /// Default permissions: every catalog module enabled.
    pub fn defaults(org_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            org_id: org_id.into(),
            enabled_modules: all_module_keys(),
            updated_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether a module key is enabled.
    pub fn is_enabled(&self, key: &str) -> bool {
        self.enabled_modules.iter().any(|k| k == key)
    }

    /// Enable a key; returns false if it was already enabled.
    pub fn enable(&mut self, key: &str) -> bool {
        if self.is_enabled(key) {
            return false;
        }
        self.enabled_modules.push(key.to_string());
        true
    }

    /// Disable a key; returns false if it was already disabled.
    pub fn disable(&mut self, key: &str) -> bool {
        let before = self.enabled_modules.len();
        self.enabled_modules.retain(|k| k != key);
        self.enabled_modules.len() != before
    }
}
