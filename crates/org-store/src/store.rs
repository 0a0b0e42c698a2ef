//! Document store abstraction and the in-memory backend
//!
//! Documents are JSON objects keyed by their `org_id` field within named
//! collections. A collection may declare unique indexes; an index can exempt
//! documents matching a field/value pair so that, for example, logically
//! deleted rows stop holding their unique name.

use crate::error::{StoreError, StoreResult};
use crate::query::{Direction, Query, Sort};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// A stored record. Always a JSON object carrying a string `org_id` field.
pub type Document = serde_json::Value;

/// Uniqueness constraint on one top-level field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueIndex {
    /// Field whose value must be unique within the collection
    pub field: &'static str,
    /// Documents where `field == value` do not participate in the index
    pub exempt_when: Option<(&'static str, &'static str)>,
}

impl UniqueIndex {
    /// Index with no exemption.
    pub fn on(field: &'static str) -> Self {
        Self {
            field,
            exempt_when: None,
        }
    }

    /// Exclude documents whose `field` equals `value` from the index.
    pub fn exempt_when(mut self, field: &'static str, value: &'static str) -> Self {
        self.exempt_when = Some((field, value));
        self
    }

    fn exempts(&self, doc: &Document) -> bool {
        match self.exempt_when {
            Some((field, value)) => doc.get(field).and_then(Value::as_str) == Some(value),
            None => false,
        }
    }
}

/// Declaration of one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSpec {
    /// Collection name
    pub name: &'static str,
    /// Unique indexes enforced on insert and replace
    pub unique: Vec<UniqueIndex>,
}

impl CollectionSpec {
    /// Collection with no unique indexes.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            unique: Vec::new(),
        }
    }

    /// Add a unique index.
    pub fn with_unique(mut self, index: UniqueIndex) -> Self {
        self.unique.push(index);
        self
    }
}

/// One page of query results.
#[derive(Debug, Clone)]
pub struct QueryPage {
    /// Documents in the requested window
    pub items: Vec<Document>,
    /// Matching documents before paging was applied
    pub total: usize,
}

/// Persistence seam for organization records.
///
/// Implementations must apply each call atomically: a failed insert or
/// replace leaves the collection unchanged, and unique checks happen under
/// the same critical section as the write.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one document by key.
    async fn get(&self, collection: &str, org_id: &str) -> StoreResult<Document>;

    /// Insert a new document. Fails if the key or a unique value is taken.
    async fn insert(&self, collection: &str, doc: Document) -> StoreResult<()>;

    /// Overwrite an existing document. Fails if the key is absent.
    async fn replace(&self, collection: &str, org_id: &str, doc: Document) -> StoreResult<()>;

    /// Remove a document by key.
    async fn delete(&self, collection: &str, org_id: &str) -> StoreResult<()>;

    /// Run a filtered, sorted, paged read.
    async fn query(&self, collection: &str, query: &Query) -> StoreResult<QueryPage>;

    /// Cheap liveness check.
    async fn ping(&self) -> StoreResult<()>;
}

struct Collection {
    spec: CollectionSpec,
    documents: HashMap<String, Document>,
}

/// In-memory [`DocumentStore`] over `tokio::sync::RwLock`.
///
/// # Examples
///
/// ```rust,no_run
/// use org_store::{CollectionSpec, DocumentStore, MemoryStore, UniqueIndex};
/// use serde_json::json;
///
/// # async fn demo() -> Result<(), org_store::StoreError> {
/// let store = MemoryStore::new(vec![
///     CollectionSpec::new("organizations").with_unique(UniqueIndex::on("name")),
/// ]);
///
/// store
///     .insert("organizations", json!({"org_id": "org_1", "name": "acme"}))
///     .await?;
/// let doc = store.get("organizations", "org_1").await?;
/// assert_eq!(doc["name"], "acme");
/// # Ok(())
/// # }
/// ```
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryStore {
    /// Create a store with the given collections.
    pub fn new(specs: Vec<CollectionSpec>) -> Self {
        let collections = specs
            .into_iter()
            .map(|spec| {
                (
                    spec.name.to_string(),
                    Collection {
                        spec,
                        documents: HashMap::new(),
                    },
                )
            })
            .collect();
        Self {
            collections: RwLock::new(collections),
        }
    }

    /// Documents currently held in a collection, for diagnostics.
    pub async fn len(&self, collection: &str) -> StoreResult<usize> {
        let collections = self.collections.read().await;
        let coll = collections
            .get(collection)
            .ok_or_else(|| StoreError::UnknownCollection(collection.to_string()))?;
        Ok(coll.documents.len())
    }
}

fn require_org_id(doc: &Document) -> StoreResult<String> {
    doc.get("org_id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            StoreError::InvalidDocument("document is missing a string org_id field".to_string())
        })
}

fn value_display(value: &Value) -> String {
    match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    }
}

// Scans the collection for another live document holding the same unique
// value. `exclude` skips the document being replaced.
fn check_unique(coll: &Collection, doc: &Document, exclude: Option<&str>) -> StoreResult<()> {
    for index in &coll.spec.unique {
        let Some(candidate) = doc.get(index.field) else {
            continue;
        };
        if candidate.is_null() || index.exempts(doc) {
            continue;
        }
        for (org_id, existing) in &coll.documents {
            if exclude == Some(org_id.as_str()) || index.exempts(existing) {
                continue;
            }
            if existing.get(index.field) == Some(candidate) {
                return Err(StoreError::Conflict {
                    collection: coll.spec.name.to_string(),
                    field: index.field.to_string(),
                    value: value_display(candidate),
                });
            }
        }
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, org_id: &str) -> StoreResult<Document> {
        let collections = self.collections.read().await;
        let coll = collections
            .get(collection)
            .ok_or_else(|| StoreError::UnknownCollection(collection.to_string()))?;
        coll.documents
            .get(org_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                org_id: org_id.to_string(),
            })
    }

    async fn insert(&self, collection: &str, doc: Document) -> StoreResult<()> {
        let org_id = require_org_id(&doc)?;
        let mut collections = self.collections.write().await;
        let coll = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::UnknownCollection(collection.to_string()))?;

        if coll.documents.contains_key(&org_id) {
            return Err(StoreError::Conflict {
                collection: collection.to_string(),
                field: "org_id".to_string(),
                value: org_id,
            });
        }
        check_unique(coll, &doc, None)?;

        debug!(collection, org_id = %org_id, "inserted document");
        coll.documents.insert(org_id, doc);
        Ok(())
    }

    async fn replace(&self, collection: &str, org_id: &str, doc: Document) -> StoreResult<()> {
        let doc_org_id = require_org_id(&doc)?;
        if doc_org_id != org_id {
            return Err(StoreError::InvalidDocument(format!(
                "document org_id '{}' does not match key '{}'",
                doc_org_id, org_id
            )));
        }

        let mut collections = self.collections.write().await;
        let coll = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::UnknownCollection(collection.to_string()))?;

        if !coll.documents.contains_key(org_id) {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                org_id: org_id.to_string(),
            });
        }
        check_unique(coll, &doc, Some(org_id))?;

        coll.documents.insert(org_id.to_string(), doc);
        Ok(())
    }

    async fn delete(&self, collection: &str, org_id: &str) -> StoreResult<()> {
        let mut collections = self.collections.write().await;
        let coll = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::UnknownCollection(collection.to_string()))?;

        if coll.documents.remove(org_id).is_none() {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                org_id: org_id.to_string(),
            });
        }
        debug!(collection, org_id, "deleted document");
        Ok(())
    }

    async fn query(&self, collection: &str, query: &Query) -> StoreResult<QueryPage> {
        let collections = self.collections.read().await;
        let coll = collections
            .get(collection)
            .ok_or_else(|| StoreError::UnknownCollection(collection.to_string()))?;

        let mut matched: Vec<Document> = coll
            .documents
            .values()
            .filter(|doc| query.filter.matches(doc))
            .cloned()
            .collect();

        // HashMap iteration order is arbitrary, so an unsorted query still
        // needs a deterministic fallback.
        let fallback;
        let sort = if query.sort.is_empty() {
            fallback = Sort::by("org_id", Direction::Asc);
            &fallback
        } else {
            &query.sort
        };
        matched.sort_by(|a, b| sort.compare(a, b));

        let total = matched.len();
        let items: Vec<Document> = match query.limit {
            Some(limit) => matched.into_iter().skip(query.offset).take(limit).collect(),
            None => matched.into_iter().skip(query.offset).collect(),
        };

        Ok(QueryPage { items, total })
    }

    async fn ping(&self) -> StoreResult<()> {
        let _ = self.collections.read().await;
        Ok(())
    }
}
