//! Module permission operations.
//!
//! The catalog itself is static; per-organization state is which catalog
//! keys are enabled. Toggles that change nothing write nothing and emit no
//! event.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::collections::MODULE_PERMISSIONS;
use crate::coordinator::Coordinator;
use crate::error::{ServiceError, ServiceResult};
use crate::organizations::{from_doc, load_live_org, to_doc};
use org_domain::{
    all_module_keys, is_known_module, BulkUpdateModulesRequest, GetModulesRequest,
    ModuleDescriptor, ModulePermissions, ModuleStatusRequest, ToggleModuleRequest, MODULE_CATALOG,
};
use org_events::OrganizationEvent;
use org_store::{DocumentStore, StoreError};

/// One catalog module annotated with the per-org enabled flag.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleStatus {
    /// Catalog key.
    pub key: &'static str,
    /// Display name.
    pub name: &'static str,
    /// UI icon identifier.
    pub icon: &'static str,
    /// Whether the organization can see this module.
    pub enabled: bool,
}

/// Module permission reads and toggles.
#[derive(Clone)]
pub struct ModuleService {
    store: Arc<dyn DocumentStore>,
    coordinator: Coordinator,
}

impl ModuleService {
    /// Wire the service against its store and coordinator.
    pub fn new(store: Arc<dyn DocumentStore>, coordinator: Coordinator) -> Self {
        Self { store, coordinator }
    }

    /// Fetch the permissions document for a live organization.
    pub async fn get(&self, request: GetModulesRequest) -> ServiceResult<ModulePermissions> {
        load_live_org(self.store.as_ref(), &request.org_id).await?;
        self.permissions_or_defaults(&request.org_id).await
    }

    /// Enable or disable one catalog module.
    ///
    /// A toggle to the state the module is already in returns the current
    /// document unchanged.
    pub async fn toggle(&self, request: ToggleModuleRequest) -> ServiceResult<ModulePermissions> {
        load_live_org(self.store.as_ref(), &request.org_id).await?;
        if !is_known_module(&request.module) {
            return Err(ServiceError::Validation(format!(
                "unknown module '{}'",
                request.module
            )));
        }

        let mut perms = self.permissions_or_defaults(&request.org_id).await?;
        let changed = if request.enabled {
            perms.enable(&request.module)
        } else {
            perms.disable(&request.module)
        };
        if !changed {
            return Ok(perms);
        }

        perms.updated_by = request.updated_by.clone();
        perms.updated_at = Utc::now();

        let doc = to_doc(&perms)?;
        let org_id = request.org_id.clone();
        let module = request.module.clone();
        let enabled = request.enabled;

        let store = &self.store;
        let perms = self
            .coordinator
            .execute(
                async move {
                    store.replace(MODULE_PERMISSIONS, &org_id, doc).await?;
                    Ok(perms)
                },
                move |perms: &ModulePermissions| {
                    if enabled {
                        OrganizationEvent::ModuleEnabled {
                            org_id: perms.org_id.clone(),
                            module,
                            enabled_modules: perms.enabled_modules.clone(),
                        }
                    } else {
                        OrganizationEvent::ModuleDisabled {
                            org_id: perms.org_id.clone(),
                            module,
                            enabled_modules: perms.enabled_modules.clone(),
                        }
                    }
                },
            )
            .await?;

        info!(
            org_id = %perms.org_id,
            module = %request.module,
            enabled,
            "module toggled"
        );
        Ok(perms)
    }

    /// Replace the enabled set in one call.
    ///
    /// The requested set is validated against the catalog as a whole, then
    /// normalized to catalog order. A request that matches the current set
    /// is a no-op.
    pub async fn bulk_update(
        &self,
        request: BulkUpdateModulesRequest,
    ) -> ServiceResult<ModulePermissions> {
        load_live_org(self.store.as_ref(), &request.org_id).await?;

        let unknown: Vec<&str> = request
            .modules
            .iter()
            .map(String::as_str)
            .filter(|key| !is_known_module(key))
            .collect();
        if !unknown.is_empty() {
            return Err(ServiceError::Validation(format!(
                "unknown modules: {}",
                unknown.join(", ")
            )));
        }

        let mut perms = self.permissions_or_defaults(&request.org_id).await?;

        let requested: Vec<String> = all_module_keys()
            .into_iter()
            .filter(|key| request.modules.iter().any(|m| m == key))
            .collect();

        let added: Vec<String> = requested
            .iter()
            .filter(|key| !perms.enabled_modules.contains(key))
            .cloned()
            .collect();
        let removed: Vec<String> = perms
            .enabled_modules
            .iter()
            .filter(|key| !requested.contains(key))
            .cloned()
            .collect();
        if added.is_empty() && removed.is_empty() {
            return Ok(perms);
        }

        perms.enabled_modules = requested;
        perms.updated_by = request.updated_by.clone();
        perms.updated_at = Utc::now();

        let doc = to_doc(&perms)?;
        let org_id = request.org_id.clone();
        let added_count = added.len();
        let removed_count = removed.len();

        let store = &self.store;
        let perms = self
            .coordinator
            .execute(
                async move {
                    store.replace(MODULE_PERMISSIONS, &org_id, doc).await?;
                    Ok(perms)
                },
                move |perms: &ModulePermissions| OrganizationEvent::ModulesUpdated {
                    org_id: perms.org_id.clone(),
                    added,
                    removed,
                    enabled_modules: perms.enabled_modules.clone(),
                },
            )
            .await?;

        info!(
            org_id = %perms.org_id,
            added = added_count,
            removed = removed_count,
            "modules updated"
        );
        Ok(perms)
    }

    /// Catalog annotated with this organization's enabled flags.
    pub async fn status(&self, request: ModuleStatusRequest) -> ServiceResult<Vec<ModuleStatus>> {
        load_live_org(self.store.as_ref(), &request.org_id).await?;
        let perms = self.permissions_or_defaults(&request.org_id).await?;

        Ok(MODULE_CATALOG
            .iter()
            .map(|descriptor| ModuleStatus {
                key: descriptor.key,
                name: descriptor.name,
                icon: descriptor.icon,
                enabled: perms.is_enabled(descriptor.key),
            })
            .collect())
    }

    /// The static module catalog.
    pub fn available(&self) -> &'static [ModuleDescriptor] {
        MODULE_CATALOG
    }

    async fn permissions_or_defaults(&self, org_id: &str) -> ServiceResult<ModulePermissions> {
        match self.store.get(MODULE_PERMISSIONS, org_id).await {
            Ok(doc) => from_doc(doc),
            Err(StoreError::NotFound { .. }) => {
                warn!(org_id, "module permissions missing; seeding defaults");
                let perms = ModulePermissions::defaults(org_id);
                self.store
                    .insert(MODULE_PERMISSIONS, to_doc(&perms)?)
                    .await?;
                Ok(perms)
            }
            Err(other) => Err(other.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::{collection_specs, ORGANIZATIONS};
    use org_domain::Organization;
    use org_events::{MemoryEventBus, Outbox, RetryConfig};
    use org_store::MemoryStore;

    async fn service_with_org() -> (ModuleService, Arc<Outbox>, String) {
        let store = Arc::new(MemoryStore::new(collection_specs()));
        let bus = Arc::new(MemoryEventBus::new());
        let outbox = Arc::new(Outbox::start(bus, RetryConfig::fast()));
        let coordinator = Coordinator::new(outbox.clone(), "org-service");

        let org = Organization::new("acme", "Acme Corp", "user_12345");
        let org_id = org.org_id.clone();
        store
            .insert(ORGANIZATIONS, serde_json::to_value(&org).unwrap())
            .await
            .unwrap();

        (ModuleService::new(store, coordinator), outbox, org_id)
    }

    fn toggle(org_id: &str, module: &str, enabled: bool) -> ToggleModuleRequest {
        ToggleModuleRequest {
            org_id: org_id.to_string(),
            module: module.to_string(),
            enabled,
            updated_by: Some("user_12345".to_string()),
        }
    }

    #[tokio::test]
    async fn test_get_seeds_full_catalog() {
        let (service, _, org_id) = service_with_org().await;

        let perms = service.get(GetModulesRequest { org_id }).await.unwrap();
        assert_eq!(perms.enabled_modules, all_module_keys());
    }

    #[tokio::test]
    async fn test_toggle_disable_and_reenable() {
        let (service, outbox, org_id) = service_with_org().await;

        let perms = service
            .toggle(toggle(&org_id, "reports", false))
            .await
            .unwrap();
        assert!(!perms.is_enabled("reports"));
        assert_eq!(perms.updated_by.as_deref(), Some("user_12345"));
        assert_eq!(outbox.stats().enqueued, 1);

        let perms = service
            .toggle(toggle(&org_id, "reports", true))
            .await
            .unwrap();
        assert!(perms.is_enabled("reports"));
        assert_eq!(outbox.stats().enqueued, 2);
    }

    #[tokio::test]
    async fn test_toggle_unknown_module_rejected() {
        let (service, _, org_id) = service_with_org().await;

        let err = service
            .toggle(toggle(&org_id, "time_travel", true))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_toggle_noop_emits_nothing() {
        let (service, outbox, org_id) = service_with_org().await;

        // Everything starts enabled, so enabling again changes nothing.
        let perms = service
            .toggle(toggle(&org_id, "dashboard", true))
            .await
            .unwrap();
        assert!(perms.is_enabled("dashboard"));
        assert_eq!(outbox.stats().enqueued, 0);
    }

    #[tokio::test]
    async fn test_bulk_update_replaces_set() {
        let (service, outbox, org_id) = service_with_org().await;

        let perms = service
            .bulk_update(BulkUpdateModulesRequest {
                org_id: org_id.clone(),
                // Out of catalog order on purpose.
                modules: vec!["reports".to_string(), "dashboard".to_string()],
                updated_by: None,
            })
            .await
            .unwrap();
        assert_eq!(perms.enabled_modules, vec!["dashboard", "reports"]);
        assert_eq!(outbox.stats().enqueued, 1);

        // Same set again is a no-op.
        let perms = service
            .bulk_update(BulkUpdateModulesRequest {
                org_id,
                modules: vec!["dashboard".to_string(), "reports".to_string()],
                updated_by: None,
            })
            .await
            .unwrap();
        assert_eq!(perms.enabled_modules, vec!["dashboard", "reports"]);
        assert_eq!(outbox.stats().enqueued, 1);
    }

    #[tokio::test]
    async fn test_bulk_update_rejects_unknown_modules() {
        let (service, _, org_id) = service_with_org().await;

        let err = service
            .bulk_update(BulkUpdateModulesRequest {
                org_id,
                modules: vec!["dashboard".to_string(), "time_travel".to_string()],
                updated_by: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert!(err.to_string().contains("time_travel"));
    }

    #[tokio::test]
    async fn test_status_reflects_disabled_modules() {
        let (service, _, org_id) = service_with_org().await;
        service
            .toggle(toggle(&org_id, "analytics", false))
            .await
            .unwrap();

        let statuses = service
            .status(ModuleStatusRequest {
                org_id: org_id.clone(),
            })
            .await
            .unwrap();
        assert_eq!(statuses.len(), MODULE_CATALOG.len());

        let analytics = statuses.iter().find(|s| s.key == "analytics").unwrap();
        assert!(!analytics.enabled);
        let dashboard = statuses.iter().find(|s| s.key == "dashboard").unwrap();
        assert!(dashboard.enabled);
    }

    #[tokio::test]
    async fn test_missing_org_rejected() {
        let (service, _, _) = service_with_org().await;

        let err = service
            .get(GetModulesRequest {
                org_id: "org_missing".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND");
    }
}
