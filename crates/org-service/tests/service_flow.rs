//! End-to-end tests for the organization service.
//!
//! These tests drive the dispatcher the way a bus transport would: named
//! operations with JSON payloads in, response envelopes out. Each fixture
//! wires a fresh in-memory store and event bus, and subscriptions on the
//! bus verify the publish half of the write-then-publish contract.
//!
//! Covered flows:
//! 1. organization lifecycle: create, update, delete policies
//! 2. settings and limits merge-patches
//! 3. module permissions against the catalog
//! 4. delivery: event ordering, bus outages, request timeouts

use std::sync::Arc;
use std::time::Duration;

use org_events::{
    Event, EventBus, EventBusError, EventBusResult, EventBusStats, MemoryEventBus, Subscription,
};
use org_service::{collection_specs, Dispatcher, Response, ServiceConfig};
use org_store::{Document, DocumentStore, MemoryStore, Query, QueryPage, StoreResult};
use serde_json::{json, Value};

/// Test fixture wiring a dispatcher against in-memory backends.
struct TestFixture {
    dispatcher: Dispatcher,
    bus: Arc<MemoryEventBus>,
}

impl TestFixture {
    /// Create a fixture with retry delays tuned for tests.
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new(collection_specs()));
        let bus = Arc::new(MemoryEventBus::new());
        let dispatcher = Dispatcher::new(test_config(), store, bus.clone());
        Self { dispatcher, bus }
    }

    /// Subscribe to a subject pattern on the backing bus.
    async fn subscribe(&self, pattern: &str) -> Subscription {
        self.bus.subscribe(pattern).await.expect("Should subscribe")
    }

    async fn dispatch(&self, operation: &str, payload: Value) -> Response {
        self.dispatcher.dispatch(operation, payload).await
    }

    /// Create an organization and return its document.
    async fn create_org(&self, name: &str) -> Value {
        let response = self
            .dispatch(
                "organization.create",
                json!({
                    "name": name,
                    "display_name": format!("{name} Display"),
                    "owner_id": "user_12345",
                }),
            )
            .await;
        assert!(response.is_success(), "create failed: {}", response.message);
        response.data.expect("Should carry the created organization")
    }

    /// Create an organization under a parent and return its document.
    async fn create_child(&self, name: &str, parent: &str) -> Value {
        let response = self
            .dispatch(
                "organization.create",
                json!({
                    "name": name,
                    "display_name": format!("{name} Display"),
                    "owner_id": "user_12345",
                    "parent_org_id": parent,
                }),
            )
            .await;
        assert!(response.is_success(), "create failed: {}", response.message);
        response.data.expect("Should carry the created organization")
    }
}

fn test_config() -> ServiceConfig {
    ServiceConfig {
        publish_max_attempts: 2,
        publish_initial_delay_ms: 1,
        publish_max_delay_ms: 5,
        ..ServiceConfig::default()
    }
}

fn org_id_of(doc: &Value) -> String {
    doc["org_id"].as_str().expect("Should have an org_id").to_string()
}

async fn recv_event(sub: &mut Subscription) -> Event {
    tokio::time::timeout(Duration::from_secs(5), sub.recv())
        .await
        .expect("Should receive an event in time")
        .expect("Should receive an event")
}

// =============================================================================
// Organization lifecycle
// =============================================================================

/// Creating an organization returns the entity and seeds its sub-documents.
#[tokio::test]
async fn test_create_returns_entity_and_seeds_defaults() {
    let fixture = TestFixture::new();

    let org = fixture.create_org("acme-corp").await;
    assert_eq!(org["name"], "acme-corp");
    assert_eq!(org["status"], "active");
    let org_id = org_id_of(&org);

    let settings = fixture
        .dispatch("organization.settings.get", json!({"org_id": org_id}))
        .await;
    assert!(settings.is_success());
    assert_eq!(settings.data.unwrap()["billing"]["cycle"], "monthly");

    let modules = fixture
        .dispatch("organization.modules.get", json!({"org_id": org_id}))
        .await;
    assert!(modules.is_success());
    let enabled = modules.data.unwrap()["enabled_modules"]
        .as_array()
        .expect("Should list enabled modules")
        .len();
    assert_eq!(enabled, 16);
}

/// Names are unique among live organizations, case-insensitively.
#[tokio::test]
async fn test_duplicate_name_is_conflict() {
    let fixture = TestFixture::new();
    fixture.create_org("acme").await;

    let response = fixture
        .dispatch(
            "organization.create",
            json!({
                "name": "ACME",
                "display_name": "Acme Again",
                "owner_id": "user_67890",
            }),
        )
        .await;

    assert!(!response.is_success());
    assert_eq!(response.error_code.as_deref(), Some("CONFLICT"));
    assert!(response.message.contains("already in use"));
}

/// Updates apply merge-patch semantics: absent leaves alone, null clears.
#[tokio::test]
async fn test_update_applies_patch_semantics() {
    let fixture = TestFixture::new();
    let org = fixture.create_org("acme").await;
    let org_id = org_id_of(&org);

    let response = fixture
        .dispatch(
            "organization.update",
            json!({
                "org_id": org_id,
                "display_name": "Acme Worldwide",
                "description": "Widgets at scale",
            }),
        )
        .await;
    assert!(response.is_success());

    let response = fixture
        .dispatch(
            "organization.update",
            json!({"org_id": org_id, "description": null}),
        )
        .await;
    assert!(response.is_success());
    let updated = response.data.unwrap();
    assert_eq!(updated["display_name"], "Acme Worldwide");
    assert!(updated.get("description").is_none() || updated["description"].is_null());
}

/// A null on a non-clearable field is rejected at decode.
#[tokio::test]
async fn test_update_rejects_null_display_name() {
    let fixture = TestFixture::new();
    let org = fixture.create_org("acme").await;

    let response = fixture
        .dispatch(
            "organization.update",
            json!({"org_id": org_id_of(&org), "display_name": null}),
        )
        .await;

    assert!(!response.is_success());
    assert_eq!(response.error_code.as_deref(), Some("VALIDATION_ERROR"));
}

/// A parent assignment that closes a loop is refused and changes nothing.
#[tokio::test]
async fn test_cycle_is_rejected_with_hierarchy_error() {
    let fixture = TestFixture::new();
    let a = fixture.create_org("org-a").await;
    let a_id = org_id_of(&a);
    let b = fixture.create_child("org-b", &a_id).await;

    let response = fixture
        .dispatch(
            "organization.update",
            json!({"org_id": a_id, "parent_org_id": org_id_of(&b)}),
        )
        .await;

    assert!(!response.is_success());
    assert_eq!(response.error_code.as_deref(), Some("HIERARCHY_ERROR"));
    assert!(response.details.is_some());

    // The organization is untouched.
    let reloaded = fixture
        .dispatch("organization.get", json!({"org_id": a_id}))
        .await;
    assert!(reloaded.data.unwrap().get("parent_org_id").is_none());
}

/// The block policy refuses while children exist; cascade takes the whole
/// subtree, children before parents on the event stream.
#[tokio::test]
async fn test_delete_block_then_cascade() {
    let fixture = TestFixture::new();
    let mut deleted = fixture.subscribe("org-service.organization.deleted").await;

    let parent = fixture.create_org("parent").await;
    let parent_id = org_id_of(&parent);
    let child = fixture.create_child("child", &parent_id).await;
    let child_id = org_id_of(&child);

    let blocked = fixture
        .dispatch("organization.delete", json!({"org_id": parent_id}))
        .await;
    assert!(!blocked.is_success());
    assert_eq!(blocked.error_code.as_deref(), Some("CONFLICT"));

    let response = fixture
        .dispatch(
            "organization.delete",
            json!({"org_id": parent_id, "policy": "cascade"}),
        )
        .await;
    assert!(response.is_success());
    let outcome = response.data.unwrap();
    assert_eq!(outcome["affected_children"], 1);
    assert_eq!(outcome["policy"], "cascade");

    // Leaves first: the child's deletion publishes before the parent's.
    let first = recv_event(&mut deleted).await;
    let second = recv_event(&mut deleted).await;
    assert_eq!(first.org_id.as_deref(), Some(child_id.as_str()));
    assert_eq!(second.org_id.as_deref(), Some(parent_id.as_str()));

    let gone = fixture
        .dispatch("organization.get", json!({"org_id": child_id}))
        .await;
    assert_eq!(gone.error_code.as_deref(), Some("NOT_FOUND"));
}

/// A logically deleted organization releases its name for reuse.
#[tokio::test]
async fn test_deleted_name_is_reusable() {
    let fixture = TestFixture::new();
    let org = fixture.create_org("phoenix").await;

    let response = fixture
        .dispatch("organization.delete", json!({"org_id": org_id_of(&org)}))
        .await;
    assert!(response.is_success());

    let reborn = fixture.create_org("phoenix").await;
    assert_ne!(org_id_of(&reborn), org_id_of(&org));
}

// =============================================================================
// Listing and search
// =============================================================================

/// The same page request returns the same window every time, and a page
/// past the end comes back empty rather than failing.
#[tokio::test]
async fn test_list_pagination_is_stable() {
    let fixture = TestFixture::new();
    for name in ["list-a", "list-b", "list-c", "list-d", "list-e"] {
        fixture.create_org(name).await;
    }

    let page_request = json!({
        "page": 2,
        "limit": 2,
        "sort_by": "name",
        "sort_order": "asc",
    });

    let first = fixture
        .dispatch("organization.list", page_request.clone())
        .await;
    let second = fixture.dispatch("organization.list", page_request).await;

    let names = |response: Response| -> Vec<String> {
        response.data.unwrap()["items"]
            .as_array()
            .expect("Should have items")
            .iter()
            .map(|item| item["name"].as_str().unwrap().to_string())
            .collect()
    };
    let first_names = names(first);
    assert_eq!(first_names, vec!["list-c", "list-d"]);
    assert_eq!(first_names, names(second));

    let past_end = fixture
        .dispatch(
            "organization.list",
            json!({"page": 6, "limit": 2, "sort_by": "name", "sort_order": "asc"}),
        )
        .await;
    let data = past_end.data.unwrap();
    assert!(data["items"].as_array().unwrap().is_empty());
    assert_eq!(data["pagination"]["total_pages"], 3);
    assert_eq!(data["pagination"]["has_next"], false);
    assert_eq!(data["pagination"]["has_prev"], true);
}

/// Search matches the display name and rejects blank queries.
#[tokio::test]
async fn test_search_over_display_name() {
    let fixture = TestFixture::new();
    let response = fixture
        .dispatch(
            "organization.create",
            json!({
                "name": "acme",
                "display_name": "Acme Worldwide",
                "owner_id": "user_12345",
            }),
        )
        .await;
    assert!(response.is_success());
    fixture.create_org("globex").await;

    let found = fixture
        .dispatch("organization.search", json!({"query": "worldwide"}))
        .await;
    let items = found.data.unwrap()["items"].as_array().unwrap().clone();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["name"], "acme");

    let blank = fixture
        .dispatch("organization.search", json!({"query": "   "}))
        .await;
    assert_eq!(blank.error_code.as_deref(), Some("VALIDATION_ERROR"));
}

// =============================================================================
// Settings and limits
// =============================================================================

/// Settings patches merge: untouched groups survive, explicit nulls clear.
#[tokio::test]
async fn test_settings_merge_flow() {
    let fixture = TestFixture::new();
    let org = fixture.create_org("acme").await;
    let org_id = org_id_of(&org);

    let response = fixture
        .dispatch(
            "organization.settings.update",
            json!({
                "org_id": org_id,
                "settings": {
                    "billing": {"email": "ap@acme.io", "payment_method_id": "pm_123"},
                },
            }),
        )
        .await;
    assert!(response.is_success());
    let settings = response.data.unwrap();
    assert_eq!(settings["billing"]["email"], "ap@acme.io");
    // Unpatched fields keep their defaults.
    assert_eq!(settings["billing"]["cycle"], "monthly");
    assert_eq!(settings["preferences"]["timezone"], "UTC");

    let response = fixture
        .dispatch(
            "organization.settings.update",
            json!({
                "org_id": org_id,
                "settings": {"billing": {"payment_method_id": null}},
            }),
        )
        .await;
    assert!(response.is_success());
    let settings = response.data.unwrap();
    assert!(settings["billing"].get("payment_method_id").is_none());
    assert_eq!(settings["billing"]["email"], "ap@acme.io");
}

/// Unknown patch groups are rejected at decode, not silently dropped.
#[tokio::test]
async fn test_settings_unknown_field_is_rejected() {
    let fixture = TestFixture::new();
    let org = fixture.create_org("acme").await;

    let response = fixture
        .dispatch(
            "organization.settings.update",
            json!({
                "org_id": org_id_of(&org),
                "settings": {"biling": {"email": "typo@acme.io"}},
            }),
        )
        .await;

    assert!(!response.is_success());
    assert_eq!(response.error_code.as_deref(), Some("VALIDATION_ERROR"));
}

/// Limits patches validate the merged document before anything is written.
#[tokio::test]
async fn test_limits_patch_validates_merged_document() {
    let fixture = TestFixture::new();
    let org = fixture.create_org("acme").await;
    let org_id = org_id_of(&org);

    let response = fixture
        .dispatch(
            "organization.limits.update",
            json!({"org_id": org_id, "limits": {"users": {"max_users": 500}}}),
        )
        .await;
    assert!(response.is_success());
    assert_eq!(response.data.unwrap()["users"]["max_users"], 500);

    let response = fixture
        .dispatch(
            "organization.limits.update",
            json!({"org_id": org_id, "limits": {"retention": {"data_days": 0}}}),
        )
        .await;
    assert!(!response.is_success());
    assert_eq!(response.error_code.as_deref(), Some("VALIDATION_ERROR"));

    // The invalid patch left the stored document alone.
    let current = fixture
        .dispatch("organization.limits.get", json!({"org_id": org_id}))
        .await;
    assert_eq!(current.data.unwrap()["users"]["max_users"], 500);
}

// =============================================================================
// Module permissions
// =============================================================================

/// Toggling and bulk-updating modules, with the catalog as the source of
/// truth for what exists.
#[tokio::test]
async fn test_module_flow() {
    let fixture = TestFixture::new();
    let org = fixture.create_org("acme").await;
    let org_id = org_id_of(&org);

    let response = fixture
        .dispatch(
            "organization.modules.toggle",
            json!({"org_id": org_id, "module": "analytics", "enabled": false}),
        )
        .await;
    assert!(response.is_success());

    let status = fixture
        .dispatch("organization.modules.status", json!({"org_id": org_id}))
        .await;
    let entries = status.data.unwrap();
    let analytics = entries
        .as_array()
        .unwrap()
        .iter()
        .find(|entry| entry["key"] == "analytics")
        .expect("Should include analytics")
        .clone();
    assert_eq!(analytics["enabled"], false);

    let response = fixture
        .dispatch(
            "organization.modules.bulk_update",
            json!({"org_id": org_id, "modules": ["reports", "dashboard"]}),
        )
        .await;
    assert!(response.is_success());
    // The enabled set is normalized to catalog order.
    assert_eq!(
        response.data.unwrap()["enabled_modules"],
        json!(["dashboard", "reports"])
    );

    let response = fixture
        .dispatch(
            "organization.modules.toggle",
            json!({"org_id": org_id, "module": "time_travel", "enabled": true}),
        )
        .await;
    assert_eq!(response.error_code.as_deref(), Some("VALIDATION_ERROR"));

    let catalog = fixture
        .dispatch("organization.modules.available", json!({}))
        .await;
    assert_eq!(catalog.data.unwrap().as_array().unwrap().len(), 16);
}

// =============================================================================
// Dispatch surface
// =============================================================================

/// Unknown operations get their own stable error code.
#[tokio::test]
async fn test_unsupported_operation() {
    let fixture = TestFixture::new();

    let response = fixture
        .dispatch("organization.destroy", json!({}))
        .await;

    assert!(!response.is_success());
    assert_eq!(
        response.error_code.as_deref(),
        Some("UNSUPPORTED_OPERATION")
    );
}

/// The byte-level entry point decodes payloads and encodes envelopes.
#[tokio::test]
async fn test_dispatch_bytes_roundtrip() {
    let fixture = TestFixture::new();

    // Empty payloads act like an empty object for optional-only requests.
    let bytes = fixture.dispatcher.dispatch_bytes("organization.list", b"").await;
    let envelope: Value = serde_json::from_slice(&bytes).expect("Should decode envelope");
    assert_eq!(envelope["status"], "success");

    let bytes = fixture
        .dispatcher
        .dispatch_bytes("organization.list", b"{not json")
        .await;
    let envelope: Value = serde_json::from_slice(&bytes).expect("Should decode envelope");
    assert_eq!(envelope["status"], "error");
    assert_eq!(envelope["error_code"], "VALIDATION_ERROR");
}

// =============================================================================
// Delivery
// =============================================================================

/// Every committed mutation publishes exactly one event, in commit order,
/// with strictly increasing per-organization sequences.
#[tokio::test]
async fn test_events_publish_in_commit_order() {
    let fixture = TestFixture::new();
    let mut sub = fixture.subscribe("org-service.>").await;

    let org = fixture.create_org("acme").await;
    let org_id = org_id_of(&org);

    fixture
        .dispatch(
            "organization.update",
            json!({"org_id": org_id, "display_name": "Acme Worldwide"}),
        )
        .await;
    fixture
        .dispatch(
            "organization.settings.update",
            json!({"org_id": org_id, "settings": {"billing": {"email": "ap@acme.io"}}}),
        )
        .await;

    let expected = [
        ("organization.created", 1),
        ("organization.updated", 2),
        ("organization.settings.updated", 3),
    ];
    for (event_type, sequence) in expected {
        let event = recv_event(&mut sub).await;
        assert_eq!(event.event_type, event_type);
        assert_eq!(event.sequence, sequence);
        assert_eq!(event.org_id.as_deref(), Some(org_id.as_str()));
    }

    fixture.dispatcher.shutdown().await;
}

struct FailBus;

#[async_trait::async_trait]
impl EventBus for FailBus {
    async fn publish(&self, _event: Event) -> EventBusResult<()> {
        Err(EventBusError::PublishError("bus offline".to_string()))
    }

    async fn subscribe(&self, _pattern: &str) -> EventBusResult<Subscription> {
        Err(EventBusError::SubscribeError("bus offline".to_string()))
    }

    async fn stats(&self) -> EventBusStats {
        EventBusStats::default()
    }
}

/// Bus outages never fail requests: the write commits, the event retries
/// and is parked in the dead-letter log, and health degrades.
#[tokio::test]
async fn test_bus_outage_never_fails_requests() {
    let store = Arc::new(MemoryStore::new(collection_specs()));
    let dispatcher = Dispatcher::new(test_config(), store, Arc::new(FailBus));

    let response = dispatcher
        .dispatch(
            "organization.create",
            json!({
                "name": "acme",
                "display_name": "Acme Corp",
                "owner_id": "user_12345",
            }),
        )
        .await;
    assert!(response.is_success(), "create failed: {}", response.message);

    for _ in 0..200 {
        if dispatcher.outbox().stats().dead_lettered > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let dead = dispatcher.outbox().dead_letters().await;
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].event.event_type, "organization.created");
    assert!(dead[0].last_error.contains("bus offline"));

    let health = dispatcher
        .dispatch("organization.health", json!({}))
        .await;
    assert!(health.is_success());
    assert_eq!(health.data.unwrap()["status"], "degraded");
}

/// A clean deployment reports healthy with both components up.
#[tokio::test]
async fn test_health_reports_healthy() {
    let fixture = TestFixture::new();

    let response = fixture
        .dispatch("organization.health", json!({}))
        .await;
    assert!(response.is_success());

    let report = response.data.unwrap();
    assert_eq!(report["status"], "healthy");
    assert_eq!(report["outbox"]["running"], true);
    let components = report["components"].as_array().unwrap();
    assert_eq!(components.len(), 2);
    assert!(components.iter().all(|c| c["status"] == "healthy"));
}

/// Wraps a store so inserts stall, to exercise the request deadline.
struct SlowStore {
    inner: MemoryStore,
    delay: Duration,
}

#[async_trait::async_trait]
impl DocumentStore for SlowStore {
    async fn get(&self, collection: &str, org_id: &str) -> StoreResult<Document> {
        self.inner.get(collection, org_id).await
    }

    async fn insert(&self, collection: &str, doc: Document) -> StoreResult<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.insert(collection, doc).await
    }

    async fn replace(&self, collection: &str, org_id: &str, doc: Document) -> StoreResult<()> {
        self.inner.replace(collection, org_id, doc).await
    }

    async fn delete(&self, collection: &str, org_id: &str) -> StoreResult<()> {
        self.inner.delete(collection, org_id).await
    }

    async fn query(&self, collection: &str, query: &Query) -> StoreResult<QueryPage> {
        self.inner.query(collection, query).await
    }

    async fn ping(&self) -> StoreResult<()> {
        self.inner.ping().await
    }
}

/// A request past its deadline answers with a timeout envelope, but the
/// in-flight write still commits and its event still publishes.
#[tokio::test(start_paused = true)]
async fn test_timeout_answers_without_cancelling_the_write() {
    let store = Arc::new(SlowStore {
        inner: MemoryStore::new(collection_specs()),
        delay: Duration::from_secs(5),
    });
    let bus = Arc::new(MemoryEventBus::new());
    let mut sub = bus.subscribe("org-service.organization.created").await.unwrap();

    let config = ServiceConfig {
        request_timeout_secs: 1,
        ..test_config()
    };
    let dispatcher = Dispatcher::new(config, store, bus);

    let response = dispatcher
        .dispatch(
            "organization.create",
            json!({
                "name": "slow-org",
                "display_name": "Slow Org",
                "owner_id": "user_12345",
            }),
        )
        .await;
    assert!(!response.is_success());
    assert_eq!(response.error_code.as_deref(), Some("TIMEOUT"));

    // The handler keeps running past the deadline: the create commits and
    // publishes once the slow inserts finish.
    let event = tokio::time::timeout(Duration::from_secs(60), sub.recv())
        .await
        .expect("Should publish after the write completes")
        .expect("Should receive the created event");
    assert_eq!(event.event_type, "organization.created");

    let org_id = event.org_id.expect("Should carry the org id");
    let response = dispatcher
        .dispatch("organization.get", json!({"org_id": org_id}))
        .await;
    assert!(response.is_success());
    assert_eq!(response.data.unwrap()["name"], "slow-org");
}
