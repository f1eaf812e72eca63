//! # RecordStore Trait
//!
//! The seam between billing logic and persistence.
//!
//! ```text
//! ┌───────────────────────────┐
//! │   repositories (typed)    │  ProductRepository, InvoiceRepository, ...
//! └─────────────┬─────────────┘
//!               │ Arc<dyn RecordStore>
//!       ┌───────┴────────┐
//!       ▼                ▼
//!  MemoryStore      SqliteStore
//!  (tests, demo)    (terminal)
//! ```
//!
//! Every call is a single attempt: no retry, no timeout. Callers own the
//! retry policy.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

use crate::error::StoreResult;
use crate::record::{Collection, Filter, ListQuery, ListResult, Record};

/// Shared handle to a store backend.
pub type SharedStore = Arc<dyn RecordStore>;

/// Settings key of the invoice counter.
pub const INVOICE_COUNTER_KEY: &str = "invoice_counter";

/// Collection CRUD with schema checks and relation expansion.
#[async_trait]
pub trait RecordStore: Send + Sync + std::fmt::Debug {
    /// Creates a record after required and unique checks.
    async fn create(&self, collection: Collection, data: Map<String, Value>) -> StoreResult<Record>;

    /// Fetches one record by id.
    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Record>;

    /// Merges `patch` into the stored payload. A `null` value clears a
    /// field.
    async fn update(
        &self,
        collection: Collection,
        id: &str,
        patch: Map<String, Value>,
    ) -> StoreResult<Record>;

    /// Lists records. Fields named in `query.expand` are expanded.
    async fn list(&self, collection: Collection, query: &ListQuery) -> StoreResult<ListResult<Record>>;

    /// Atomically adds one to the numeric `value` of a settings record and
    /// returns the new value. A missing key starts from zero.
    async fn increment_counter(&self, key: &str) -> StoreResult<u64>;

    /// First record matching `filter`.
    async fn first(
        &self,
        collection: Collection,
        filter: Filter,
        sort: &str,
    ) -> StoreResult<Option<Record>> {
        let query = ListQuery::new(filter).sort(sort).page(1, 1);
        Ok(self.list(collection, &query).await?.items.into_iter().next())
    }

    /// Every record matching `filter`, across all pages.
    async fn list_all(
        &self,
        collection: Collection,
        filter: Filter,
        sort: &str,
    ) -> StoreResult<Vec<Record>> {
        let mut items = Vec::new();
        let mut page = 1;
        loop {
            let query = ListQuery::new(filter.clone())
                .sort(sort)
                .page(page, crate::record::MAX_PER_PAGE);
            let result = self.list(collection, &query).await?;
            let done = u64::from(page) >= result.total_pages;
            items.extend(result.items);
            if done {
                break;
            }
            page += 1;
        }
        Ok(items)
    }

    /// Fetches related records for the named relation fields.
    ///
    /// Unknown fields and dangling references are skipped.
    async fn expand(&self, mut record: Record, fields: &[String]) -> StoreResult<Record> {
        for field in fields {
            let Some(target) = record.collection.relation_target(field) else {
                debug!(collection = %record.collection, field = %field, "Not a relation field");
                continue;
            };
            let Some(id) = record.str_field(field).map(str::to_string) else {
                continue;
            };
            match self.get(target, &id).await {
                Ok(related) => {
                    record.expand.insert(field.clone(), related);
                }
                Err(e) if e.is_not_found() => {
                    debug!(field = %field, id = %id, "Dangling relation");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(record)
    }
}
