//! Request dispatch.
//!
//! The dispatcher is the composition root: it owns the services, the
//! event outbox and the concurrency limiter, maps inbound operation names
//! to handlers and turns every outcome into a response envelope. Unknown
//! operations get their own error code instead of a generic failure.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::config::ServiceConfig;
use crate::coordinator::Coordinator;
use crate::envelope::Response;
use crate::error::{ServiceError, ServiceResult};
use crate::health::HealthService;
use crate::hierarchy::HierarchyValidator;
use crate::modules::ModuleService;
use crate::organizations::{to_doc, OrganizationService};
use org_events::{EventBus, Outbox};
use org_store::DocumentStore;

/// Operations the service answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreateOrganization,
    GetOrganization,
    UpdateOrganization,
    DeleteOrganization,
    ListOrganizations,
    SearchOrganizations,
    GetSettings,
    UpdateSettings,
    GetLimits,
    UpdateLimits,
    GetModules,
    ToggleModule,
    BulkUpdateModules,
    ModuleStatus,
    AvailableModules,
    Health,
}

impl Operation {
    /// Parse an operation name from the wire.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "organization.create" => Some(Self::CreateOrganization),
            "organization.get" => Some(Self::GetOrganization),
            "organization.update" => Some(Self::UpdateOrganization),
            "organization.delete" => Some(Self::DeleteOrganization),
            "organization.list" => Some(Self::ListOrganizations),
            "organization.search" => Some(Self::SearchOrganizations),
            "organization.settings.get" => Some(Self::GetSettings),
            "organization.settings.update" => Some(Self::UpdateSettings),
            "organization.limits.get" => Some(Self::GetLimits),
            "organization.limits.update" => Some(Self::UpdateLimits),
            "organization.modules.get" => Some(Self::GetModules),
            "organization.modules.toggle" => Some(Self::ToggleModule),
            "organization.modules.bulk_update" => Some(Self::BulkUpdateModules),
            "organization.modules.status" => Some(Self::ModuleStatus),
            "organization.modules.available" => Some(Self::AvailableModules),
            "organization.health" => Some(Self::Health),
            _ => None,
        }
    }

    /// Wire name of the operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateOrganization => "organization.create",
            Self::GetOrganization => "organization.get",
            Self::UpdateOrganization => "organization.update",
            Self::DeleteOrganization => "organization.delete",
            Self::ListOrganizations => "organization.list",
            Self::SearchOrganizations => "organization.search",
            Self::GetSettings => "organization.settings.get",
            Self::UpdateSettings => "organization.settings.update",
            Self::GetLimits => "organization.limits.get",
            Self::UpdateLimits => "organization.limits.update",
            Self::GetModules => "organization.modules.get",
            Self::ToggleModule => "organization.modules.toggle",
            Self::BulkUpdateModules => "organization.modules.bulk_update",
            Self::ModuleStatus => "organization.modules.status",
            Self::AvailableModules => "organization.modules.available",
            Self::Health => "organization.health",
        }
    }
}

/// Routes decoded operations to their handlers.
///
/// Owns every long-lived component: construct one per process, share it
/// behind an `Arc`, and call [`Dispatcher::shutdown`] before exit so
/// buffered events drain.
pub struct Dispatcher {
    organizations: Arc<OrganizationService>,
    modules: Arc<ModuleService>,
    health: Arc<HealthService>,
    outbox: Arc<Outbox>,
    limiter: Arc<Semaphore>,
    timeout: Duration,
}

impl Dispatcher {
    /// Wire the full service against a store and an event bus.
    pub fn new(
        config: ServiceConfig,
        store: Arc<dyn DocumentStore>,
        bus: Arc<dyn EventBus>,
    ) -> Self {
        let outbox = Arc::new(Outbox::start(bus, config.retry_config()));
        let coordinator = Coordinator::new(outbox.clone(), config.service_name.clone());
        let hierarchy = HierarchyValidator::new(store.clone(), config.max_hierarchy_depth);

        let organizations = Arc::new(OrganizationService::new(
            store.clone(),
            coordinator.clone(),
            hierarchy,
            config.clone(),
        ));
        let modules = Arc::new(ModuleService::new(store.clone(), coordinator));
        let health = Arc::new(HealthService::new(
            store,
            outbox.clone(),
            config.service_name.clone(),
        ));

        Self {
            organizations,
            modules,
            health,
            outbox,
            limiter: Arc::new(Semaphore::new(config.max_concurrent_requests)),
            timeout: config.request_timeout(),
        }
    }

    /// The outbox handle, for operational inspection.
    pub fn outbox(&self) -> &Arc<Outbox> {
        &self.outbox
    }

    /// Stop accepting requests and drain buffered events.
    pub async fn shutdown(&self) {
        self.limiter.close();
        self.outbox.shutdown().await;
        info!("dispatcher shut down");
    }

    /// Dispatch one decoded operation.
    ///
    /// The handler runs on its own task under a concurrency permit and a
    /// deadline. A request that exceeds the deadline gets a timeout
    /// envelope, but the handler is not cancelled: an in-flight store
    /// write still completes and its change event still publishes.
    pub async fn dispatch(&self, operation: &str, payload: Value) -> Response {
        let Some(op) = Operation::parse(operation) else {
            warn!(operation, "unsupported operation");
            return Response::error(&ServiceError::UnsupportedOperation(operation.to_string()));
        };

        let permit = match self.limiter.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                return Response::error(&ServiceError::StoreUnavailable(
                    "service is shutting down".to_string(),
                ));
            }
        };

        let organizations = self.organizations.clone();
        let modules = self.modules.clone();
        let health = self.health.clone();

        let handle = tokio::spawn(async move {
            let _permit = permit;
            run(op, payload, organizations, modules, health).await
        });

        match tokio::time::timeout(self.timeout, handle).await {
            Ok(Ok(Ok(response))) => response,
            Ok(Ok(Err(err))) => Response::error(&err),
            Ok(Err(join_err)) => {
                error!(operation = op.as_str(), error = %join_err, "request task failed");
                Response::error(&ServiceError::StoreUnavailable(
                    "request task failed".to_string(),
                ))
            }
            Err(_) => {
                warn!(operation = op.as_str(), timeout = ?self.timeout, "request timed out");
                Response::error(&ServiceError::Timeout(self.timeout))
            }
        }
    }

    /// Dispatch a raw payload and encode the envelope back to bytes.
    pub async fn dispatch_bytes(&self, operation: &str, payload: &[u8]) -> Vec<u8> {
        let value = if payload.is_empty() {
            Value::Null
        } else {
            match serde_json::from_slice(payload) {
                Ok(value) => value,
                Err(err) => {
                    let err = ServiceError::Validation(format!("invalid request payload: {err}"));
                    return encode_response(&Response::error(&err));
                }
            }
        };

        encode_response(&self.dispatch(operation, value).await)
    }
}

fn encode_response(response: &Response) -> Vec<u8> {
    serde_json::to_vec(response).unwrap_or_else(|err| {
        error!(error = %err, "response encode failed");
        br#"{"status":"error","message":"response encoding failed"}"#.to_vec()
    })
}

/// Decode a request payload, treating `null` as an empty object so
/// requests with only optional fields can omit the body.
fn decode<T: DeserializeOwned>(payload: Value) -> ServiceResult<T> {
    let payload = if payload.is_null() { json!({}) } else { payload };
    serde_json::from_value(payload)
        .map_err(|err| ServiceError::Validation(format!("invalid request: {err}")))
}

async fn run(
    op: Operation,
    payload: Value,
    organizations: Arc<OrganizationService>,
    modules: Arc<ModuleService>,
    health: Arc<HealthService>,
) -> ServiceResult<Response> {
    match op {
        Operation::CreateOrganization => {
            let org = organizations.create(decode(payload)?).await?;
            Ok(Response::success("organization created", to_doc(&org)?))
        }
        Operation::GetOrganization => {
            let org = organizations.get(decode(payload)?).await?;
            Ok(Response::success("organization retrieved", to_doc(&org)?))
        }
        Operation::UpdateOrganization => {
            let org = organizations.update(decode(payload)?).await?;
            Ok(Response::success("organization updated", to_doc(&org)?))
        }
        Operation::DeleteOrganization => {
            let outcome = organizations.delete(decode(payload)?).await?;
            Ok(Response::success("organization deleted", to_doc(&outcome)?))
        }
        Operation::ListOrganizations => {
            let (items, page) = organizations.list(decode(payload)?).await?;
            let items = items
                .iter()
                .map(to_doc)
                .collect::<ServiceResult<Vec<Value>>>()?;
            Ok(Response::paged("organizations listed", items, page))
        }
        Operation::SearchOrganizations => {
            let (items, page) = organizations.search(decode(payload)?).await?;
            let items = items
                .iter()
                .map(to_doc)
                .collect::<ServiceResult<Vec<Value>>>()?;
            Ok(Response::paged("organizations searched", items, page))
        }
        Operation::GetSettings => {
            let settings = organizations.get_settings(decode(payload)?).await?;
            Ok(Response::success("settings retrieved", to_doc(&settings)?))
        }
        Operation::UpdateSettings => {
            let settings = organizations.update_settings(decode(payload)?).await?;
            Ok(Response::success("settings updated", to_doc(&settings)?))
        }
        Operation::GetLimits => {
            let limits = organizations.get_limits(decode(payload)?).await?;
            Ok(Response::success("limits retrieved", to_doc(&limits)?))
        }
        Operation::UpdateLimits => {
            let limits = organizations.update_limits(decode(payload)?).await?;
            Ok(Response::success("limits updated", to_doc(&limits)?))
        }
        Operation::GetModules => {
            let perms = modules.get(decode(payload)?).await?;
            Ok(Response::success("modules retrieved", to_doc(&perms)?))
        }
        Operation::ToggleModule => {
            let perms = modules.toggle(decode(payload)?).await?;
            Ok(Response::success("module toggled", to_doc(&perms)?))
        }
        Operation::BulkUpdateModules => {
            let perms = modules.bulk_update(decode(payload)?).await?;
            Ok(Response::success("modules updated", to_doc(&perms)?))
        }
        Operation::ModuleStatus => {
            let statuses = modules.status(decode(payload)?).await?;
            Ok(Response::success(
                "module status retrieved",
                to_doc(&statuses)?,
            ))
        }
        Operation::AvailableModules => {
            let catalog = modules.available();
            Ok(Response::success(
                "module catalog retrieved",
                to_doc(&catalog)?,
            ))
        }
        Operation::Health => {
            let report = health.report().await;
            Ok(Response::success("health checked", to_doc(&report)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_names_roundtrip() {
        let names = [
            "organization.create",
            "organization.get",
            "organization.update",
            "organization.delete",
            "organization.list",
            "organization.search",
            "organization.settings.get",
            "organization.settings.update",
            "organization.limits.get",
            "organization.limits.update",
            "organization.modules.get",
            "organization.modules.toggle",
            "organization.modules.bulk_update",
            "organization.modules.status",
            "organization.modules.available",
            "organization.health",
        ];

        for name in names {
            let op = Operation::parse(name).unwrap();
            assert_eq!(op.as_str(), name);
        }
        assert!(Operation::parse("organization.destroy").is_none());
    }

    #[test]
    fn test_decode_null_as_empty_object() {
        let request: org_domain::ListOrganizationsRequest = decode(Value::Null).unwrap();
        assert_eq!(request.page, 1);
        assert_eq!(request.limit, 20);
    }

    #[test]
    fn test_decode_reports_field_errors() {
        let err = decode::<org_domain::GetOrganizationRequest>(json!({})).unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }
}
