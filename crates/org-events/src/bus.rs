//! Event bus abstraction and the in-memory implementation
//!
//! The bus delivers published events to subscribers whose subject pattern
//! matches the event topic. Patterns use NATS-style wildcards: `*` matches
//! exactly one dot-separated token, and a trailing `>` matches one or more
//! remaining tokens.

use crate::types::Event;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};

/// Errors raised by bus backends.
#[derive(Debug, Error)]
pub enum EventBusError {
    #[error("publish failed: {0}")]
    PublishError(String),

    #[error("subscribe failed: {0}")]
    SubscribeError(String),

    #[error("connection error: {0}")]
    ConnectionError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("channel closed")]
    ChannelClosed,
}

impl EventBusError {
    /// Whether a retry could plausibly succeed.
    ///
    /// Serialization failures and closed channels are permanent; everything
    /// else is assumed to be a transient transport problem.
    pub fn is_transient(&self) -> bool {
        !matches!(
            self,
            EventBusError::SerializationError(_) | EventBusError::ChannelClosed
        )
    }
}

pub type EventBusResult<T> = Result<T, EventBusError>;

/// Handle for one subscription's event stream.
pub struct Subscription {
    pub id: String,
    /// The pattern this subscription was created with
    pub pattern: String,
    pub receiver: broadcast::Receiver<Event>,
}

impl Subscription {
    /// Wait for the next matching event.
    pub async fn recv(&mut self) -> EventBusResult<Event> {
        self.receiver
            .recv()
            .await
            .map_err(|_| EventBusError::ChannelClosed)
    }
}

/// Publish/subscribe seam between the outbox and a transport.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish an event to its topic.
    async fn publish(&self, event: Event) -> EventBusResult<()>;

    /// Subscribe to a subject pattern.
    ///
    /// Patterns support NATS-style wildcards:
    /// - `*` matches exactly one token
    /// - `>` (only as the last token) matches one or more remaining tokens
    ///
    /// Examples:
    /// - `org-service.organization.*` matches `org-service.organization.created`
    /// - `org-service.>` matches every event the service publishes
    async fn subscribe(&self, pattern: &str) -> EventBusResult<Subscription>;

    /// Snapshot of delivery counters.
    async fn stats(&self) -> EventBusStats;
}

/// Delivery counters reported by a backend.
#[derive(Debug, Clone, Default)]
pub struct EventBusStats {
    pub events_published: u64,
    /// Per-subscriber deliveries; one publish can deliver many times
    pub events_delivered: u64,
    pub active_subscriptions: usize,
}

/// In-memory bus for single-process deployments and tests.
///
/// One broadcast channel per subject pattern; publishing walks the
/// patterns and sends to every channel that matches the event topic.
pub struct MemoryEventBus {
    subscribers: RwLock<HashMap<String, broadcast::Sender<Event>>>,
    events_published: AtomicU64,
    events_delivered: AtomicU64,
    channel_capacity: usize,
}

impl std::fmt::Debug for MemoryEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEventBus")
            .field("channel_capacity", &self.channel_capacity)
            .finish()
    }
}

impl MemoryEventBus {
    /// Create a new in-memory event bus.
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    /// Create with custom channel capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            events_published: AtomicU64::new(0),
            events_delivered: AtomicU64::new(0),
            channel_capacity: capacity,
        }
    }

    /// Check if a subject matches a pattern.
    fn subject_matches(pattern: &str, subject: &str) -> bool {
        let pattern_tokens: Vec<&str> = pattern.split('.').collect();
        let subject_tokens: Vec<&str> = subject.split('.').collect();

        for (i, token) in pattern_tokens.iter().enumerate() {
            match *token {
                // `>` is only valid as the final token and requires at
                // least one subject token left to consume.
                ">" => return i + 1 == pattern_tokens.len() && subject_tokens.len() > i,
                "*" => {
                    if i >= subject_tokens.len() {
                        return false;
                    }
                }
                literal => {
                    if subject_tokens.get(i) != Some(&literal) {
                        return false;
                    }
                }
            }
        }

        pattern_tokens.len() == subject_tokens.len()
    }
}

impl Default for MemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for MemoryEventBus {
    async fn publish(&self, event: Event) -> EventBusResult<()> {
        let topic = event.topic();
        self.events_published.fetch_add(1, Ordering::Relaxed);

        let subscribers = self.subscribers.read().await;
        for (pattern, sender) in subscribers.iter() {
            if Self::subject_matches(pattern, &topic) {
                if let Ok(delivered) = sender.send(event.clone()) {
                    self.events_delivered
                        .fetch_add(delivered as u64, Ordering::Relaxed);
                }
            }
        }

        Ok(())
    }

    async fn subscribe(&self, pattern: &str) -> EventBusResult<Subscription> {
        let id = uuid::Uuid::now_v7().to_string();

        let receiver = {
            let mut subscribers = self.subscribers.write().await;

            if let Some(sender) = subscribers.get(pattern) {
                sender.subscribe()
            } else {
                let (sender, receiver) = broadcast::channel(self.channel_capacity);
                subscribers.insert(pattern.to_string(), sender);
                receiver
            }
        };

        Ok(Subscription {
            id,
            pattern: pattern.to_string(),
            receiver,
        })
    }

    async fn stats(&self) -> EventBusStats {
        let subscribers = self.subscribers.read().await;
        EventBusStats {
            events_published: self.events_published.load(Ordering::Relaxed),
            events_delivered: self.events_delivered.load(Ordering::Relaxed),
            active_subscriptions: subscribers.values().map(|s| s.receiver_count()).sum(),
        }
    }
}
