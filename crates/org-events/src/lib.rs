//! # org-events
//!
//! Eventing for the organization service: the event envelope, the bus
//! abstraction, and the write-then-publish outbox that connects committed
//! mutations to the bus.
//!
//! ## Overview
//!
//! - **Event Types**: [`Event`] envelope plus the typed [`OrganizationEvent`]
//! - **Event Bus**: publish/subscribe with NATS-style subject wildcards
//! - **Outbox**: synchronous enqueue after commit, background publication
//!   with retry and a dead-letter log
//! - **Retry**: exponential backoff utilities used by the outbox drainer
//!
//! ## Features
//!
//! - `memory` (default): in-memory event bus for single-process deployments
//! - `nats`: NATS-backed event bus for distributed systems
//!
//! ## Delivery contract
//!
//! Every committed mutation enqueues exactly one event. The outbox stamps a
//! per-organization sequence at enqueue time and publishes in enqueue order,
//! so consumers of `{service}.>` can totally order the events of any one
//! organization by `sequence`. Publish failures are retried with backoff;
//! events that exhaust their attempts are parked in the dead-letter log and
//! never fail the originating request.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use org_events::{Event, EventBus, MemoryEventBus, Outbox, OrganizationEvent, RetryConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), org_events::EventBusError> {
//! let bus = Arc::new(MemoryEventBus::new());
//! let mut sub = bus.subscribe("org-service.organization.*").await?;
//!
//! let outbox = Outbox::start(bus, RetryConfig::standard());
//!
//! // After a mutation commits:
//! let event = OrganizationEvent::Created {
//!     org_id: "org_1a2b3c4d".to_string(),
//!     organization: serde_json::json!({"name": "acme"}),
//! };
//! outbox.enqueue(event.to_event("org-service"))?;
//!
//! let received = sub.recv().await?;
//! assert_eq!(received.sequence, 1);
//!
//! outbox.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod bus;
pub mod outbox;
pub mod retry;
pub mod types;

#[cfg(feature = "nats")]
pub mod nats;

// Re-export main types
pub use bus::{
    EventBus, EventBusError, EventBusResult, EventBusStats, MemoryEventBus, Subscription,
};
pub use outbox::{DeadLetter, Outbox, OutboxStats};
pub use retry::{with_retry, with_retry_if, RetryConfig};
pub use types::{Event, OrganizationEvent};

#[cfg(feature = "nats")]
pub use nats::{NatsEventBus, NatsEventBusConfig};
