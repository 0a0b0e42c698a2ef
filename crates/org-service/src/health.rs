//! Service health reporting.
//!
//! The health operation probes the two components a request depends on:
//! the document store and the event outbox. Dead-lettered events degrade
//! the service without taking it unhealthy; a stopped publisher or an
//! unreachable store does.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error};

use org_events::{Outbox, OutboxStats};
use org_store::DocumentStore;

/// Overall health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// All components healthy.
    Healthy,
    /// Functional, but something needs operational attention.
    Degraded,
    /// The service cannot serve requests reliably.
    Unhealthy,
}

/// Health of one internal component.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    /// Component name.
    pub name: &'static str,

    /// Component status.
    pub status: HealthStatus,

    /// Explanation when not healthy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Aggregated health check result.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// Reporting service.
    pub service: String,

    /// Overall status.
    pub status: HealthStatus,

    /// Individual component health.
    pub components: Vec<ComponentHealth>,

    /// Outbox counters at check time.
    pub outbox: OutboxStats,

    /// When the check ran.
    pub timestamp: DateTime<Utc>,
}

/// Health checks over the store and the event outbox.
pub struct HealthService {
    store: Arc<dyn DocumentStore>,
    outbox: Arc<Outbox>,
    service_name: String,
}

impl HealthService {
    /// Create a health service for the given components.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        outbox: Arc<Outbox>,
        service_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            outbox,
            service_name: service_name.into(),
        }
    }

    /// Probe each component and aggregate the result.
    pub async fn report(&self) -> HealthReport {
        let store_health = match self.store.ping().await {
            Ok(()) => ComponentHealth {
                name: "store",
                status: HealthStatus::Healthy,
                detail: None,
            },
            Err(err) => {
                error!(error = %err, "store ping failed");
                ComponentHealth {
                    name: "store",
                    status: HealthStatus::Unhealthy,
                    detail: Some(err.to_string()),
                }
            }
        };

        let stats = self.outbox.stats();
        let outbox_health = if !stats.running {
            ComponentHealth {
                name: "outbox",
                status: HealthStatus::Unhealthy,
                detail: Some("publisher task is not running".to_string()),
            }
        } else if stats.dead_lettered > 0 {
            ComponentHealth {
                name: "outbox",
                status: HealthStatus::Degraded,
                detail: Some(format!("{} dead-lettered events", stats.dead_lettered)),
            }
        } else {
            ComponentHealth {
                name: "outbox",
                status: HealthStatus::Healthy,
                detail: None,
            }
        };

        let components = vec![store_health, outbox_health];
        let status = Self::aggregate_status(&components);
        debug!(status = ?status, "health check complete");

        HealthReport {
            service: self.service_name.clone(),
            status,
            components,
            outbox: stats,
            timestamp: Utc::now(),
        }
    }

    /// Worst component status wins.
    fn aggregate_status(components: &[ComponentHealth]) -> HealthStatus {
        if components
            .iter()
            .any(|c| c.status == HealthStatus::Unhealthy)
        {
            HealthStatus::Unhealthy
        } else if components
            .iter()
            .any(|c| c.status == HealthStatus::Degraded)
        {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }
}
