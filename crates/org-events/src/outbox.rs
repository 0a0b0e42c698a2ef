//! Write-then-publish outbox
//!
//! Mutations commit to the store first, then hand their event to the outbox.
//! [`Outbox::enqueue`] is synchronous and cannot fail on bus trouble, so a
//! flaky transport never turns a committed write into a request error. A
//! single background drainer publishes enqueued events in order, retrying
//! transient failures with exponential backoff and parking exhausted events
//! in a dead-letter log.
//!
//! Sequence numbers are stamped per organization under the same lock as the
//! channel send, so channel order and sequence order agree: consumers see
//! strictly increasing sequences for any one `org_id`.

use crate::bus::{EventBus, EventBusError, EventBusResult};
use crate::retry::{with_retry_if, RetryConfig};
use crate::types::Event;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// An event the drainer gave up on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetter {
    /// The event that could not be published
    pub event: Event,
    /// Publish attempts made before giving up
    pub attempts: u32,
    /// The final error
    pub last_error: String,
    /// When the drainer gave up
    pub failed_at: DateTime<Utc>,
}

/// Outbox statistics snapshot.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct OutboxStats {
    /// Events accepted by `enqueue`
    pub enqueued: u64,
    /// Events published to the bus
    pub published: u64,
    /// Events parked in the dead-letter log
    pub dead_lettered: u64,
    /// Events enqueued but not yet published or dead-lettered
    pub pending: u64,
    /// Whether the drainer task is alive
    pub running: bool,
}

struct Counters {
    enqueued: AtomicU64,
    published: AtomicU64,
    dead_lettered: AtomicU64,
    running: AtomicBool,
}

struct EnqueueState {
    /// `None` once the outbox has been shut down
    tx: Option<mpsc::UnboundedSender<Event>>,
    /// Next sequence is `sequences[org] + 1`
    sequences: HashMap<String, u64>,
}

/// Buffer between committed mutations and the event bus.
pub struct Outbox {
    state: Mutex<EnqueueState>,
    counters: Arc<Counters>,
    dead_letters: Arc<RwLock<Vec<DeadLetter>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for Outbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("Outbox")
            .field("enqueued", &stats.enqueued)
            .field("published", &stats.published)
            .field("dead_lettered", &stats.dead_lettered)
            .field("running", &stats.running)
            .finish()
    }
}

impl Outbox {
    /// Start an outbox draining into the given bus.
    pub fn start(bus: Arc<dyn EventBus>, retry: RetryConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let counters = Arc::new(Counters {
            enqueued: AtomicU64::new(0),
            published: AtomicU64::new(0),
            dead_lettered: AtomicU64::new(0),
            running: AtomicBool::new(true),
        });
        let dead_letters = Arc::new(RwLock::new(Vec::new()));

        let task = tokio::spawn(drain(
            rx,
            bus,
            retry,
            counters.clone(),
            dead_letters.clone(),
        ));

        Self {
            state: Mutex::new(EnqueueState {
                tx: Some(tx),
                sequences: HashMap::new(),
            }),
            counters,
            dead_letters,
            task: Mutex::new(Some(task)),
        }
    }

    /// Enqueue an event for publication, returning its sequence number.
    ///
    /// Stamps the per-organization sequence and hands the event to the
    /// drainer. Fails only when the outbox has been shut down; bus trouble
    /// is handled by the drainer and never surfaces here.
    pub fn enqueue(&self, mut event: Event) -> EventBusResult<u64> {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());

        let tx = match state.tx.as_ref() {
            Some(tx) => tx.clone(),
            None => return Err(EventBusError::ChannelClosed),
        };

        // Events without org context share one sequence under the empty key.
        let key = event.org_id.clone().unwrap_or_default();
        let next = state.sequences.entry(key).or_insert(0);
        *next += 1;
        event.sequence = *next;
        let sequence = *next;

        // Send while still holding the lock so channel order matches
        // sequence order.
        tx.send(event).map_err(|_| EventBusError::ChannelClosed)?;
        drop(state);

        self.counters.enqueued.fetch_add(1, Ordering::Relaxed);
        Ok(sequence)
    }

    /// Snapshot of outbox statistics.
    pub fn stats(&self) -> OutboxStats {
        let enqueued = self.counters.enqueued.load(Ordering::Relaxed);
        let published = self.counters.published.load(Ordering::Relaxed);
        let dead_lettered = self.counters.dead_lettered.load(Ordering::Relaxed);
        OutboxStats {
            enqueued,
            published,
            dead_lettered,
            pending: enqueued.saturating_sub(published).saturating_sub(dead_lettered),
            running: self.counters.running.load(Ordering::Relaxed),
        }
    }

    /// Events the drainer gave up on, oldest first.
    pub async fn dead_letters(&self) -> Vec<DeadLetter> {
        self.dead_letters.read().await.clone()
    }

    /// Stop accepting events, drain what is already enqueued, and wait for
    /// the drainer to finish.
    pub async fn shutdown(&self) {
        {
            let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
            state.tx.take();
        }

        let task = {
            let mut task = self.task.lock().unwrap_or_else(|p| p.into_inner());
            task.take()
        };
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!(error = %e, "outbox drainer task failed");
            }
        }
    }
}

async fn drain(
    mut rx: mpsc::UnboundedReceiver<Event>,
    bus: Arc<dyn EventBus>,
    retry: RetryConfig,
    counters: Arc<Counters>,
    dead_letters: Arc<RwLock<Vec<DeadLetter>>>,
) {
    while let Some(event) = rx.recv().await {
        let result = with_retry_if(
            &retry,
            || bus.publish(event.clone()),
            EventBusError::is_transient,
        )
        .await;

        match result {
            Ok(()) => {
                counters.published.fetch_add(1, Ordering::Relaxed);
                debug!(
                    topic = %event.topic(),
                    sequence = event.sequence,
                    "published event"
                );
            }
            Err(e) => {
                counters.dead_lettered.fetch_add(1, Ordering::Relaxed);
                error!(
                    topic = %event.topic(),
                    sequence = event.sequence,
                    error = %e,
                    "dead-lettering event after exhausting publish attempts"
                );
                dead_letters.write().await.push(DeadLetter {
                    event,
                    attempts: retry.max_attempts,
                    last_error: e.to_string(),
                    failed_at: Utc::now(),
                });
            }
        }
    }
    counters.running.store(false, Ordering::Relaxed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{EventBusStats, MemoryEventBus, Subscription};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    fn immediate() -> RetryConfig {
        RetryConfig {
            max_attempts: 2,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            exponential_base: 2.0,
        }
    }

    fn org_event(org_id: &str) -> Event {
        Event::new("organization.updated", "org-service", json!({})).with_org(org_id)
    }

    struct FailingBus {
        attempts: AtomicU32,
    }

    #[async_trait]
    impl EventBus for FailingBus {
        async fn publish(&self, _event: Event) -> EventBusResult<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(EventBusError::PublishError("bus offline".to_string()))
        }

        async fn subscribe(&self, _pattern: &str) -> EventBusResult<Subscription> {
            Err(EventBusError::SubscribeError("bus offline".to_string()))
        }

        async fn stats(&self) -> EventBusStats {
            EventBusStats::default()
        }
    }

    async fn wait_until(outbox: &Outbox, predicate: impl Fn(&OutboxStats) -> bool) {
        for _ in 0..200 {
            if predicate(&outbox.stats()) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached, stats: {:?}", outbox.stats());
    }

    #[tokio::test]
    async fn test_sequences_are_per_org() {
        let bus = Arc::new(MemoryEventBus::new());
        let outbox = Outbox::start(bus, RetryConfig::no_retry());

        assert_eq!(outbox.enqueue(org_event("org_a")).unwrap(), 1);
        assert_eq!(outbox.enqueue(org_event("org_b")).unwrap(), 1);
        assert_eq!(outbox.enqueue(org_event("org_a")).unwrap(), 2);
        assert_eq!(outbox.enqueue(org_event("org_a")).unwrap(), 3);
        assert_eq!(outbox.enqueue(org_event("org_b")).unwrap(), 2);

        outbox.shutdown().await;
    }

    #[tokio::test]
    async fn test_events_publish_in_enqueue_order() {
        let bus = Arc::new(MemoryEventBus::new());
        let mut sub = bus.subscribe("org-service.>").await.unwrap();
        let outbox = Outbox::start(bus, immediate());

        for _ in 0..3 {
            outbox.enqueue(org_event("org_a")).unwrap();
        }

        for expected in 1..=3u64 {
            let event = tokio::time::timeout(Duration::from_secs(1), sub.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(event.sequence, expected);
        }

        outbox.shutdown().await;
    }

    #[tokio::test]
    async fn test_failing_bus_dead_letters_after_retries() {
        let bus = Arc::new(FailingBus {
            attempts: AtomicU32::new(0),
        });
        let outbox = Outbox::start(bus.clone(), immediate());

        outbox.enqueue(org_event("org_a")).unwrap();
        wait_until(&outbox, |stats| stats.dead_lettered == 1).await;

        assert_eq!(bus.attempts.load(Ordering::SeqCst), 2);
        let dead = outbox.dead_letters().await;
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].attempts, 2);
        assert!(dead[0].last_error.contains("bus offline"));

        let stats = outbox.stats();
        assert_eq!(stats.published, 0);
        assert_eq!(stats.pending, 0);

        outbox.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_drains_pending_events() {
        let bus = Arc::new(MemoryEventBus::new());
        let outbox = Outbox::start(bus.clone(), immediate());

        for _ in 0..5 {
            outbox.enqueue(org_event("org_a")).unwrap();
        }
        outbox.shutdown().await;

        let stats = outbox.stats();
        assert_eq!(stats.published, 5);
        assert_eq!(stats.pending, 0);
        assert!(!stats.running);
        assert_eq!(bus.stats().await.events_published, 5);
    }

    #[tokio::test]
    async fn test_enqueue_after_shutdown_fails() {
        let bus = Arc::new(MemoryEventBus::new());
        let outbox = Outbox::start(bus, immediate());
        outbox.shutdown().await;

        let err = outbox.enqueue(org_event("org_a")).unwrap_err();
        assert!(matches!(err, EventBusError::ChannelClosed));
    }
}
