//! NATS-backed event bus for distributed deployments.
//!
//! Topics map directly onto NATS subjects and subscription patterns use
//! native NATS wildcards, so no translation happens on either side.

use crate::bus::{EventBus, EventBusError, EventBusResult, EventBusStats, Subscription};
use crate::types::Event;
use async_trait::async_trait;
use futures::StreamExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// NATS event bus configuration.
#[derive(Debug, Clone)]
pub struct NatsEventBusConfig {
    /// NATS server URL (e.g., nats://localhost:4222)
    pub url: String,

    /// Capacity of the local broadcast channel behind each subscription
    pub channel_capacity: usize,
}

impl Default for NatsEventBusConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("NATS_URL")
                .unwrap_or_else(|_| "nats://127.0.0.1:4222".to_string()),
            channel_capacity: 1024,
        }
    }
}

struct NatsCounters {
    published: AtomicU64,
    delivered: AtomicU64,
    active: AtomicU64,
}

/// NATS-backed event bus implementation.
///
/// Each subscription holds a server-side NATS subscription plus a local
/// forwarding task that decodes payloads into [`Event`]s.
///
/// # Example
///
/// ```rust,no_run
/// use org_events::nats::{NatsEventBus, NatsEventBusConfig};
/// use org_events::EventBus;
///
/// # async fn example() -> Result<(), org_events::EventBusError> {
/// let bus = NatsEventBus::new(NatsEventBusConfig::default()).await?;
/// let mut sub = bus.subscribe("org-service.>").await?;
/// # Ok(())
/// # }
/// ```
pub struct NatsEventBus {
    client: async_nats::Client,
    config: NatsEventBusConfig,
    counters: Arc<NatsCounters>,
}

impl std::fmt::Debug for NatsEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NatsEventBus")
            .field("config", &self.config)
            .finish()
    }
}

impl NatsEventBus {
    /// Connect to the configured NATS server.
    pub async fn new(config: NatsEventBusConfig) -> EventBusResult<Self> {
        let client = async_nats::connect(&config.url)
            .await
            .map_err(|e| EventBusError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            config,
            counters: Arc::new(NatsCounters {
                published: AtomicU64::new(0),
                delivered: AtomicU64::new(0),
                active: AtomicU64::new(0),
            }),
        })
    }

    /// Connect with default configuration.
    pub async fn with_defaults() -> EventBusResult<Self> {
        Self::new(NatsEventBusConfig::default()).await
    }
}

#[async_trait]
impl EventBus for NatsEventBus {
    async fn publish(&self, event: Event) -> EventBusResult<()> {
        let payload = serde_json::to_vec(&event)
            .map_err(|e| EventBusError::SerializationError(e.to_string()))?;

        self.client
            .publish(event.topic(), payload.into())
            .await
            .map_err(|e| EventBusError::PublishError(e.to_string()))?;

        // publish only buffers; flush to surface transport errors here so
        // the outbox retry sees them.
        self.client
            .flush()
            .await
            .map_err(|e| EventBusError::PublishError(e.to_string()))?;

        self.counters.published.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn subscribe(&self, pattern: &str) -> EventBusResult<Subscription> {
        let id = uuid::Uuid::now_v7().to_string();

        let mut subscriber = self
            .client
            .subscribe(pattern.to_string())
            .await
            .map_err(|e| EventBusError::SubscribeError(e.to_string()))?;

        let (sender, receiver) = broadcast::channel(self.config.channel_capacity);
        let counters = self.counters.clone();
        counters.active.fetch_add(1, Ordering::Relaxed);
        let forward_pattern = pattern.to_string();

        tokio::spawn(async move {
            while let Some(message) = subscriber.next().await {
                let event: Event = match serde_json::from_slice(&message.payload) {
                    Ok(event) => event,
                    Err(e) => {
                        warn!(error = %e, "dropping undecodable event payload");
                        continue;
                    }
                };
                match sender.send(event) {
                    Ok(_) => {
                        counters.delivered.fetch_add(1, Ordering::Relaxed);
                    }
                    // All receivers dropped; stop forwarding.
                    Err(_) => break,
                }
            }
            counters.active.fetch_sub(1, Ordering::Relaxed);
            debug!(pattern = %forward_pattern, "subscription forwarder stopped");
        });

        Ok(Subscription {
            id,
            pattern: pattern.to_string(),
            receiver,
        })
    }

    async fn stats(&self) -> EventBusStats {
        EventBusStats {
            events_published: self.counters.published.load(Ordering::Relaxed),
            events_delivered: self.counters.delivered.load(Ordering::Relaxed),
            active_subscriptions: self.counters.active.load(Ordering::Relaxed) as usize,
        }
    }
}
