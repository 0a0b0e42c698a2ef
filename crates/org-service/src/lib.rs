//! # org-service
//!
//! Record-of-truth service for organization entities. Requests arrive as
//! named operations with JSON payloads, mutate documents through the
//! store, and publish one change event per committed mutation through the
//! outbox in [`org_events`].
//!
//! ## Overview
//!
//! - [`Dispatcher`]: composition root; maps operation names to handlers
//!   under a concurrency limit and a per-request deadline
//! - [`OrganizationService`]: create/get/update/delete/list/search plus
//!   the settings and limits documents
//! - [`ModuleService`]: per-organization module permissions against the
//!   platform catalog
//! - [`HealthService`]: store and publisher health rolled up into one
//!   report
//! - [`Coordinator`]: write-then-publish ordering for every mutation
//! - [`Response`]: the envelope every operation answers with
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use org_events::MemoryEventBus;
//! use org_service::{collection_specs, Dispatcher, ServiceConfig};
//! use org_store::MemoryStore;
//! use serde_json::json;
//!
//! # async fn example() {
//! let store = Arc::new(MemoryStore::new(collection_specs()));
//! let bus = Arc::new(MemoryEventBus::new());
//! let dispatcher = Dispatcher::new(ServiceConfig::from_env(), store, bus);
//!
//! let response = dispatcher
//!     .dispatch(
//!         "organization.create",
//!         json!({
//!             "name": "acme-corp",
//!             "display_name": "Acme Corp",
//!             "owner_id": "user_12345"
//!         }),
//!     )
//!     .await;
//! assert!(response.is_success());
//!
//! dispatcher.shutdown().await;
//! # }
//! ```

pub mod collections;
pub mod config;
pub mod coordinator;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod health;
pub mod hierarchy;
pub mod modules;
pub mod organizations;
pub mod pagination;

pub use collections::{
    collection_specs, MODULE_PERMISSIONS, ORGANIZATIONS, ORGANIZATION_LIMITS,
    ORGANIZATION_SETTINGS,
};
pub use config::{DeleteMode, ServiceConfig};
pub use coordinator::Coordinator;
pub use dispatcher::{Dispatcher, Operation};
pub use envelope::{Response, ResponseStatus};
pub use error::{ServiceError, ServiceResult};
pub use health::{ComponentHealth, HealthReport, HealthService, HealthStatus};
pub use hierarchy::{HierarchyError, HierarchyValidator};
pub use modules::{ModuleService, ModuleStatus};
pub use organizations::{DeletionOutcome, OrganizationService};
pub use pagination::{PageInfo, PageRequest};
