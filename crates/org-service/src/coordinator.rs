//! Write-then-publish coordination.
//!
//! Every mutation runs through [`Coordinator::execute`]: the store write
//! happens first, and only a durably committed write enqueues its change
//! event. A failed write enqueues nothing; a committed write always
//! enqueues exactly one event. Delivery itself is the outbox's problem and
//! never blocks or fails the caller.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, error};

use crate::error::{ServiceError, ServiceResult};
use org_events::{OrganizationEvent, Outbox};

/// Couples store mutations to event emission.
#[derive(Debug, Clone)]
pub struct Coordinator {
    outbox: Arc<Outbox>,
    service_name: String,
}

impl Coordinator {
    /// Create a coordinator publishing under the given service name.
    pub fn new(outbox: Arc<Outbox>, service_name: impl Into<String>) -> Self {
        Self {
            outbox,
            service_name: service_name.into(),
        }
    }

    /// Run a mutation and enqueue its change event on success.
    ///
    /// The event closure sees the mutation's output, so the payload always
    /// reflects post-commit state. Enqueueing only fails once the outbox
    /// has shut down; that is reported as a store failure since the write
    /// already happened but downstream consumers will not hear about it.
    pub async fn execute<T, Fut, E>(&self, mutation: Fut, event: E) -> ServiceResult<T>
    where
        Fut: Future<Output = ServiceResult<T>>,
        E: FnOnce(&T) -> OrganizationEvent,
    {
        let outcome = mutation.await?;

        let event = event(&outcome).to_event(&self.service_name);
        let event_type = event.event_type.clone();

        match self.outbox.enqueue(event) {
            Ok(sequence) => {
                debug!(event_type, sequence, "change event enqueued");
                Ok(outcome)
            }
            Err(err) => {
                error!(
                    event_type,
                    error = %err,
                    "mutation committed but event could not be enqueued"
                );
                Err(ServiceError::StoreUnavailable(
                    "event outbox is shut down".to_string(),
                ))
            }
        }
    }
}
