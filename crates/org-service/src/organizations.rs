//! Organization entity operations.
//!
//! Each operation validates against persisted state, commits through the
//! coordinator and returns the post-mutation entity. Reads never see
//! logically deleted organizations.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use serde_json::Value;
use tracing::{info, warn};

use crate::collections::{
    MODULE_PERMISSIONS, ORGANIZATIONS, ORGANIZATION_LIMITS, ORGANIZATION_SETTINGS,
};
use crate::config::{DeleteMode, ServiceConfig};
use crate::coordinator::Coordinator;
use crate::error::{ServiceError, ServiceResult};
use crate::hierarchy::HierarchyValidator;
use crate::pagination::{sort_for, PageInfo, PageRequest};
use org_domain::{
    merge_limits, merge_settings, CreateOrganizationRequest, DeleteOrganizationRequest,
    DeletePolicy, GetLimitsRequest, GetOrganizationRequest, GetSettingsRequest,
    ListOrganizationsRequest, ModulePermissions, Organization, OrganizationLimits,
    OrganizationSettings, OrganizationStatus, Patch, SearchOrganizationsRequest,
    UpdateLimitsRequest, UpdateOrganizationRequest, UpdateSettingsRequest,
};
use org_events::OrganizationEvent;
use org_store::{DocumentStore, Filter, Query, StoreError};

/// Encode an entity as a store document.
pub(crate) fn to_doc<T: Serialize>(entity: &T) -> ServiceResult<Value> {
    serde_json::to_value(entity)
        .map_err(|err| ServiceError::StoreUnavailable(format!("document encode failed: {err}")))
}

/// Decode a store document into an entity.
pub(crate) fn from_doc<T: DeserializeOwned>(doc: Value) -> ServiceResult<T> {
    serde_json::from_value(doc)
        .map_err(|err| ServiceError::StoreUnavailable(format!("document decode failed: {err}")))
}

/// Load an organization that exists and is not logically deleted.
pub(crate) async fn load_live_org(
    store: &dyn DocumentStore,
    org_id: &str,
) -> ServiceResult<Organization> {
    let doc = match store.get(ORGANIZATIONS, org_id).await {
        Ok(doc) => doc,
        Err(StoreError::NotFound { .. }) => {
            return Err(ServiceError::NotFound(format!(
                "organization '{org_id}' not found"
            )));
        }
        Err(other) => return Err(other.into()),
    };

    let org: Organization = from_doc(doc)?;
    if org.is_deleted() {
        return Err(ServiceError::NotFound(format!(
            "organization '{org_id}' not found"
        )));
    }
    Ok(org)
}

fn serialize_policy<S: Serializer>(policy: &DeletePolicy, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(policy.as_str())
}

fn serialize_mode<S: Serializer>(mode: &DeleteMode, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(mode.as_str())
}

/// What a delete operation did.
#[derive(Debug, Clone, Serialize)]
pub struct DeletionOutcome {
    /// Deleted organization.
    pub org_id: String,

    /// Its canonical name, released for reuse on logical deletes.
    pub name: String,

    /// Child policy that was applied.
    #[serde(serialize_with = "serialize_policy")]
    pub policy: DeletePolicy,

    /// Whether records were marked or physically removed.
    #[serde(serialize_with = "serialize_mode")]
    pub mode: DeleteMode,

    /// Children cascaded to or detached.
    pub affected_children: usize,
}

/// CRUD, listing and sub-document operations for organizations.
#[derive(Clone)]
pub struct OrganizationService {
    store: Arc<dyn DocumentStore>,
    coordinator: Coordinator,
    hierarchy: HierarchyValidator,
    config: ServiceConfig,
}

impl OrganizationService {
    /// Wire the service against its store and coordinator.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        coordinator: Coordinator,
        hierarchy: HierarchyValidator,
        config: ServiceConfig,
    ) -> Self {
        Self {
            store,
            coordinator,
            hierarchy,
            config,
        }
    }

    /// Create an organization along with its default satellite documents.
    pub async fn create(&self, request: CreateOrganizationRequest) -> ServiceResult<Organization> {
        let canonical = request.validate()?;
        let org = request.into_organization(canonical);

        if let Some(parent) = &org.parent_org_id {
            self.hierarchy.validate(&org.org_id, parent).await?;
        }

        let settings = OrganizationSettings::defaults(org.org_id.clone());
        let limits = OrganizationLimits::defaults(org.org_id.clone());
        let modules = ModulePermissions::defaults(org.org_id.clone());

        let org_doc = to_doc(&org)?;
        let settings_doc = to_doc(&settings)?;
        let limits_doc = to_doc(&limits)?;
        let modules_doc = to_doc(&modules)?;
        let event_doc = org_doc.clone();

        let store = &self.store;
        let created = self
            .coordinator
            .execute(
                async move {
                    // The organizations insert carries the uniqueness checks,
                    // so it goes first; the satellite documents cannot
                    // conflict on a fresh org_id.
                    store.insert(ORGANIZATIONS, org_doc).await?;
                    store.insert(ORGANIZATION_SETTINGS, settings_doc).await?;
                    store.insert(ORGANIZATION_LIMITS, limits_doc).await?;
                    store.insert(MODULE_PERMISSIONS, modules_doc).await?;
                    Ok(org)
                },
                move |org: &Organization| OrganizationEvent::Created {
                    org_id: org.org_id.clone(),
                    organization: event_doc,
                },
            )
            .await?;

        info!(org_id = %created.org_id, name = %created.name, "organization created");
        Ok(created)
    }

    /// Fetch one organization.
    pub async fn get(&self, request: GetOrganizationRequest) -> ServiceResult<Organization> {
        load_live_org(self.store.as_ref(), &request.org_id).await
    }

    /// Apply a partial update to an organization.
    pub async fn update(&self, request: UpdateOrganizationRequest) -> ServiceResult<Organization> {
        request.validate()?;
        let current = load_live_org(self.store.as_ref(), &request.org_id).await?;

        if let Patch::Set(parent) = &request.parent_org_id {
            self.hierarchy.validate(&request.org_id, parent).await?;
        }

        let (next, updated_fields) = request.apply_to(&current);
        if updated_fields.is_empty() {
            return Err(ServiceError::Validation(
                "no updatable fields in request".to_string(),
            ));
        }

        let updated_fields: Vec<String> =
            updated_fields.iter().map(|f| f.to_string()).collect();
        let fields_for_event = updated_fields.clone();
        let doc = to_doc(&next)?;
        let event_doc = doc.clone();
        let org_id = request.org_id.clone();

        let store = &self.store;
        let next = self
            .coordinator
            .execute(
                async move {
                    store.replace(ORGANIZATIONS, &org_id, doc).await?;
                    Ok(next)
                },
                move |org: &Organization| OrganizationEvent::Updated {
                    org_id: org.org_id.clone(),
                    updated_fields: fields_for_event,
                    organization: event_doc,
                },
            )
            .await?;

        info!(org_id = %next.org_id, fields = ?updated_fields, "organization updated");
        Ok(next)
    }

    /// Delete an organization under the requested child policy.
    pub async fn delete(
        &self,
        request: DeleteOrganizationRequest,
    ) -> ServiceResult<DeletionOutcome> {
        let org = load_live_org(self.store.as_ref(), &request.org_id).await?;
        let children = self.live_children(&org.org_id).await?;

        let affected_children = match request.policy {
            DeletePolicy::Block => {
                if !children.is_empty() {
                    return Err(ServiceError::Conflict(format!(
                        "organization '{}' has {} child organizations; use cascade or orphan",
                        org.org_id,
                        children.len()
                    )));
                }
                0
            }
            DeletePolicy::Cascade => {
                let descendants = self.live_descendants(&org.org_id).await?;
                let count = descendants.len();
                // Leaves first, so no live child ever references a deleted parent.
                for descendant in descendants.into_iter().rev() {
                    self.finalize_delete(descendant, request.policy).await?;
                }
                count
            }
            DeletePolicy::Orphan => {
                let count = children.len();
                for child in children {
                    self.detach_from_parent(child).await?;
                }
                count
            }
        };

        let outcome = DeletionOutcome {
            org_id: org.org_id.clone(),
            name: org.name.clone(),
            policy: request.policy,
            mode: self.config.delete_mode,
            affected_children,
        };

        self.finalize_delete(org, request.policy).await?;
        info!(
            org_id = %outcome.org_id,
            policy = outcome.policy.as_str(),
            mode = outcome.mode.as_str(),
            affected_children,
            "organization deleted"
        );
        Ok(outcome)
    }

    /// List organizations with filters, sorting and pagination.
    pub async fn list(
        &self,
        request: ListOrganizationsRequest,
    ) -> ServiceResult<(Vec<Organization>, PageInfo)> {
        let page = PageRequest::new(request.page, request.limit, &self.config);

        let mut filter = match request.status {
            Some(status) => Filter::new().eq("status", status.as_str()),
            None => Filter::new().ne("status", OrganizationStatus::Deleted.as_str()),
        };
        if let Some(owner_id) = &request.owner_id {
            filter = filter.eq("owner_id", owner_id.as_str());
        }
        if let Some(parent) = &request.parent_org_id {
            filter = filter.eq("parent_org_id", parent.as_str());
        }
        if !request.tags.is_empty() {
            let tags = request.tags.iter().map(|t| Value::from(t.as_str())).collect();
            filter = filter.any_of("tags", tags);
        }
        if let Some(search) = &request.search {
            let needle = search.trim();
            if !needle.is_empty() {
                filter = filter.text(&["name", "display_name", "description"], needle);
            }
        }

        let query = Query {
            filter,
            sort: sort_for(request.sort_by, request.sort_order),
            offset: page.offset(),
            limit: Some(page.limit),
        };

        let result = self.store.query(ORGANIZATIONS, &query).await?;
        let info = PageInfo::compute(&page, result.total);
        let items = result
            .items
            .into_iter()
            .map(from_doc)
            .collect::<ServiceResult<Vec<Organization>>>()?;

        Ok((items, info))
    }

    /// Free-text search over name, display name and description.
    pub async fn search(
        &self,
        request: SearchOrganizationsRequest,
    ) -> ServiceResult<(Vec<Organization>, PageInfo)> {
        let query = request.query.trim().to_string();
        if query.is_empty() {
            return Err(ServiceError::Validation(
                "query must not be empty".to_string(),
            ));
        }

        self.list(ListOrganizationsRequest {
            page: request.page,
            limit: request.limit,
            search: Some(query),
            sort_by: request.sort_by,
            sort_order: request.sort_order,
            ..ListOrganizationsRequest::default()
        })
        .await
    }

    /// Fetch the settings document for a live organization.
    pub async fn get_settings(
        &self,
        request: GetSettingsRequest,
    ) -> ServiceResult<OrganizationSettings> {
        load_live_org(self.store.as_ref(), &request.org_id).await?;
        self.settings_or_defaults(&request.org_id).await
    }

    /// Merge-patch the settings document.
    pub async fn update_settings(
        &self,
        request: UpdateSettingsRequest,
    ) -> ServiceResult<OrganizationSettings> {
        load_live_org(self.store.as_ref(), &request.org_id).await?;
        if request.settings.is_empty() {
            return Err(ServiceError::Validation(
                "patch contains no fields".to_string(),
            ));
        }

        let current = self.settings_or_defaults(&request.org_id).await?;
        let mut merged = merge_settings(&current, &request.settings);
        merged.updated_at = Utc::now();

        let updated_fields: Vec<String> = request
            .settings
            .touched()
            .iter()
            .map(|f| f.to_string())
            .collect();
        let doc = to_doc(&merged)?;
        let event_doc = doc.clone();
        let org_id = request.org_id.clone();

        let store = &self.store;
        let merged = self
            .coordinator
            .execute(
                async move {
                    store.replace(ORGANIZATION_SETTINGS, &org_id, doc).await?;
                    Ok(merged)
                },
                move |settings: &OrganizationSettings| OrganizationEvent::SettingsUpdated {
                    org_id: settings.org_id.clone(),
                    updated_fields,
                    settings: event_doc,
                },
            )
            .await?;

        info!(org_id = %merged.org_id, "organization settings updated");
        Ok(merged)
    }

    /// Fetch the limits document for a live organization.
    pub async fn get_limits(
        &self,
        request: GetLimitsRequest,
    ) -> ServiceResult<OrganizationLimits> {
        load_live_org(self.store.as_ref(), &request.org_id).await?;
        self.limits_or_defaults(&request.org_id).await
    }

    /// Merge-patch the limits document. The merged result is re-validated
    /// before anything is written.
    pub async fn update_limits(
        &self,
        request: UpdateLimitsRequest,
    ) -> ServiceResult<OrganizationLimits> {
        load_live_org(self.store.as_ref(), &request.org_id).await?;
        if request.limits.is_empty() {
            return Err(ServiceError::Validation(
                "patch contains no fields".to_string(),
            ));
        }

        let current = self.limits_or_defaults(&request.org_id).await?;
        let mut merged = merge_limits(&current, &request.limits);
        merged.validate()?;
        merged.updated_at = Utc::now();

        let updated_fields: Vec<String> = request
            .limits
            .touched()
            .iter()
            .map(|f| f.to_string())
            .collect();
        let doc = to_doc(&merged)?;
        let event_doc = doc.clone();
        let org_id = request.org_id.clone();

        let store = &self.store;
        let merged = self
            .coordinator
            .execute(
                async move {
                    store.replace(ORGANIZATION_LIMITS, &org_id, doc).await?;
                    Ok(merged)
                },
                move |limits: &OrganizationLimits| OrganizationEvent::LimitsUpdated {
                    org_id: limits.org_id.clone(),
                    updated_fields,
                    limits: event_doc,
                },
            )
            .await?;

        info!(org_id = %merged.org_id, "organization limits updated");
        Ok(merged)
    }

    async fn settings_or_defaults(&self, org_id: &str) -> ServiceResult<OrganizationSettings> {
        match self.store.get(ORGANIZATION_SETTINGS, org_id).await {
            Ok(doc) => from_doc(doc),
            Err(StoreError::NotFound { .. }) => {
                // Heal organizations that predate the settings collection.
                warn!(org_id, "settings document missing; seeding defaults");
                let settings = OrganizationSettings::defaults(org_id);
                self.store
                    .insert(ORGANIZATION_SETTINGS, to_doc(&settings)?)
                    .await?;
                Ok(settings)
            }
            Err(other) => Err(other.into()),
        }
    }

    async fn limits_or_defaults(&self, org_id: &str) -> ServiceResult<OrganizationLimits> {
        match self.store.get(ORGANIZATION_LIMITS, org_id).await {
            Ok(doc) => from_doc(doc),
            Err(StoreError::NotFound { .. }) => {
                warn!(org_id, "limits document missing; seeding defaults");
                let limits = OrganizationLimits::defaults(org_id);
                self.store
                    .insert(ORGANIZATION_LIMITS, to_doc(&limits)?)
                    .await?;
                Ok(limits)
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Live direct children of an organization.
    async fn live_children(&self, org_id: &str) -> ServiceResult<Vec<Organization>> {
        let query = Query::filtered(
            Filter::new()
                .eq("parent_org_id", org_id)
                .ne("status", OrganizationStatus::Deleted.as_str()),
        );
        let result = self.store.query(ORGANIZATIONS, &query).await?;
        result
            .items
            .into_iter()
            .map(from_doc)
            .collect::<ServiceResult<Vec<Organization>>>()
    }

    /// Live descendants in breadth-first order, parents before children.
    async fn live_descendants(&self, org_id: &str) -> ServiceResult<Vec<Organization>> {
        let mut queue = VecDeque::from([org_id.to_string()]);
        let mut descendants = Vec::new();

        while let Some(current) = queue.pop_front() {
            for child in self.live_children(&current).await? {
                queue.push_back(child.org_id.clone());
                descendants.push(child);
            }
        }

        Ok(descendants)
    }

    async fn detach_from_parent(&self, mut child: Organization) -> ServiceResult<()> {
        child.parent_org_id = None;
        child.touch();

        let doc = to_doc(&child)?;
        let event_doc = doc.clone();
        let org_id = child.org_id.clone();

        let store = &self.store;
        self.coordinator
            .execute(
                async move {
                    store.replace(ORGANIZATIONS, &org_id, doc).await?;
                    Ok(child)
                },
                move |org: &Organization| OrganizationEvent::Updated {
                    org_id: org.org_id.clone(),
                    updated_fields: vec!["parent_org_id".to_string()],
                    organization: event_doc,
                },
            )
            .await?;
        Ok(())
    }

    async fn finalize_delete(
        &self,
        mut org: Organization,
        policy: DeletePolicy,
    ) -> ServiceResult<()> {
        let mode = self.config.delete_mode;
        let store = &self.store;

        self.coordinator
            .execute(
                async move {
                    match mode {
                        DeleteMode::Logical => {
                            org.status = OrganizationStatus::Deleted;
                            org.touch();
                            let doc = to_doc(&org)?;
                            store.replace(ORGANIZATIONS, &org.org_id, doc).await?;
                        }
                        DeleteMode::Physical => {
                            store.delete(ORGANIZATIONS, &org.org_id).await?;
                            for collection in [
                                ORGANIZATION_SETTINGS,
                                ORGANIZATION_LIMITS,
                                MODULE_PERMISSIONS,
                            ] {
                                match store.delete(collection, &org.org_id).await {
                                    Ok(()) | Err(StoreError::NotFound { .. }) => {}
                                    Err(other) => return Err(other.into()),
                                }
                            }
                        }
                    }
                    Ok(org)
                },
                move |org: &Organization| OrganizationEvent::Deleted {
                    org_id: org.org_id.clone(),
                    name: org.name.clone(),
                    policy: policy.as_str().to_string(),
                },
            )
            .await?;
        Ok(())
    }
}
