//! # org-store
//!
//! Schema-less document storage for the organization service.
//!
//! ## Overview
//!
//! - **Documents**: JSON objects keyed by their `org_id` field
//! - **Collections**: declared up front, optionally with unique indexes
//! - **Unique indexes**: may exempt documents by field value, so logically
//!   deleted records release constrained values such as `name`
//! - **Queries**: ANDed conditions, multi-key sort, offset/limit paging
//! - **Backends**: [`MemoryStore`] ships in-crate; other backends implement
//!   [`DocumentStore`]
//!
//! ## Usage
//!
//! ```rust,no_run
//! use org_store::{
//!     CollectionSpec, Direction, DocumentStore, Filter, MemoryStore, Query, Sort, UniqueIndex,
//! };
//! use serde_json::json;
//!
//! # async fn demo() -> Result<(), org_store::StoreError> {
//! let store = MemoryStore::new(vec![CollectionSpec::new("organizations")
//!     .with_unique(UniqueIndex::on("name").exempt_when("status", "deleted"))]);
//!
//! store
//!     .insert(
//!         "organizations",
//!         json!({"org_id": "org_1", "name": "acme", "status": "active"}),
//!     )
//!     .await?;
//!
//! let query = Query::filtered(Filter::new().ne("status", "deleted"))
//!     .sorted(Sort::by("created_at", Direction::Desc).then("org_id", Direction::Asc))
//!     .page(0, 20);
//! let page = store.query("organizations", &query).await?;
//! assert_eq!(page.total, 1);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod query;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use query::{value_cmp, Condition, Direction, Filter, Query, Sort};
pub use store::{CollectionSpec, Document, DocumentStore, MemoryStore, QueryPage, UniqueIndex};
