//! Collection names and their uniqueness constraints.

use org_store::{CollectionSpec, UniqueIndex};

/// Organization records.
pub const ORGANIZATIONS: &str = "organizations";

/// Per-organization settings documents.
pub const ORGANIZATION_SETTINGS: &str = "organization_settings";

/// Per-organization limits documents.
pub const ORGANIZATION_LIMITS: &str = "organization_limits";

/// Per-organization module permission documents.
pub const MODULE_PERMISSIONS: &str = "module_permissions";

/// Collection specs for every collection the service owns.
///
/// Organization names are unique among live records; logically deleted
/// organizations release their name for reuse.
pub fn collection_specs() -> Vec<CollectionSpec> {
    vec![
        CollectionSpec::new(ORGANIZATIONS)
            .with_unique(UniqueIndex::on("name").exempt_when("status", "deleted")),
        CollectionSpec::new(ORGANIZATION_SETTINGS),
        CollectionSpec::new(ORGANIZATION_LIMITS),
        CollectionSpec::new(MODULE_PERMISSIONS),
    ]
}
