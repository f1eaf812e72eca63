//! # In-Memory Backend
//!
//! A [`RecordStore`] held entirely in process, behind a tokio `RwLock`.
//! Used by tests and demos; enforces the same schema rules as SQLite.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::record::{Collection, ListQuery, ListResult, Record};
use crate::store::RecordStore;

/// In-memory record store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Records per collection, in insertion order.
    collections: RwLock<HashMap<Collection, Vec<Record>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Number of records in a collection.
    pub async fn count(&self, collection: Collection) -> usize {
        self.collections
            .read()
            .await
            .get(&collection)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

fn check_unique(
    collection: Collection,
    records: &[Record],
    data: &Map<String, Value>,
    except_id: Option<&str>,
) -> StoreResult<()> {
    for (field, value) in collection.unique_values(data) {
        let taken = records.iter().any(|r| {
            Some(r.id.as_str()) != except_id
                && collection
                    .unique_values(&r.data)
                    .iter()
                    .any(|(f, v)| *f == field && *v == value)
        });
        if taken {
            return Err(StoreError::duplicate(field, value));
        }
    }
    Ok(())
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn create(&self, collection: Collection, data: Map<String, Value>) -> StoreResult<Record> {
        collection.check_required(&data)?;

        let mut guard = self.collections.write().await;
        let records = guard.entry(collection).or_default();
        check_unique(collection, records, &data, None)?;

        let now = Utc::now();
        let record = Record {
            id: Record::new_id(),
            collection,
            created: now,
            updated: now,
            data,
            expand: BTreeMap::new(),
        };
        records.push(record.clone());

        debug!(collection = %collection, id = %record.id, "Record created");
        Ok(record)
    }

    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Record> {
        self.collections
            .read()
            .await
            .get(&collection)
            .and_then(|records| records.iter().find(|r| r.id == id))
            .cloned()
            .ok_or_else(|| StoreError::not_found(collection.name(), id))
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        patch: Map<String, Value>,
    ) -> StoreResult<Record> {
        let mut guard = self.collections.write().await;
        let records = guard.entry(collection).or_default();

        let position = records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| StoreError::not_found(collection.name(), id))?;

        let mut merged = records[position].data.clone();
        for (key, value) in patch {
            if value.is_null() {
                merged.remove(&key);
            } else {
                merged.insert(key, value);
            }
        }
        collection.check_required(&merged)?;
        check_unique(collection, records, &merged, Some(id))?;

        let record = &mut records[position];
        record.data = merged;
        record.updated = Utc::now();

        debug!(collection = %collection, id = %id, "Record updated");
        Ok(record.clone())
    }

    async fn list(&self, collection: Collection, query: &ListQuery) -> StoreResult<ListResult<Record>> {
        let snapshot = self
            .collections
            .read()
            .await
            .get(&collection)
            .cloned()
            .unwrap_or_default();

        let page = query.apply(snapshot);
        if query.expand.is_empty() {
            return Ok(page);
        }

        let mut expanded = Vec::with_capacity(page.items.len());
        for record in page.items {
            expanded.push(self.expand(record, &query.expand).await?);
        }
        Ok(ListResult {
            items: expanded,
            ..page
        })
    }

    async fn increment_counter(&self, key: &str) -> StoreResult<u64> {
        let mut guard = self.collections.write().await;
        let settings = guard.entry(Collection::Settings).or_default();

        let existing = settings
            .iter_mut()
            .find(|r| r.data.get("key").and_then(Value::as_str) == Some(key));

        let next = match existing {
            Some(record) => {
                let current = counter_value(record)?;
                let next = current + 1;
                record
                    .data
                    .insert("value".to_string(), Value::String(next.to_string()));
                record.updated = Utc::now();
                next
            }
            None => {
                let now = Utc::now();
                let mut data = Map::new();
                data.insert("key".to_string(), Value::String(key.to_string()));
                data.insert("value".to_string(), Value::String("1".to_string()));
                data.insert("category".to_string(), Value::String("invoice".to_string()));
                settings.push(Record {
                    id: Record::new_id(),
                    collection: Collection::Settings,
                    created: now,
                    updated: now,
                    data,
                    expand: BTreeMap::new(),
                });
                1
            }
        };

        debug!(key = %key, value = next, "Counter incremented");
        Ok(next)
    }
}

/// Parses the numeric `value` of a settings record. Stored as text.
pub(crate) fn counter_value(record: &Record) -> StoreResult<u64> {
    match record.data.get("value") {
        Some(Value::String(s)) if s.trim().is_empty() => Ok(0),
        Some(Value::String(s)) => s.trim().parse().map_err(|_| StoreError::Decode {
            collection: Collection::Settings.name().to_string(),
            id: record.id.clone(),
            reason: format!("counter value '{}' is not a number", s),
        }),
        Some(Value::Number(n)) => Ok(n.as_u64().unwrap_or(0)),
        _ => Ok(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Filter;
    use serde_json::json;
    use std::sync::Arc;

    fn payload(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_create_get_update() {
        let store = MemoryStore::new();
        let created = store
            .create(
                Collection::Customers,
                payload(json!({"name": "Asha", "mobile": "9876543210"})),
            )
            .await
            .unwrap();

        let fetched = store.get(Collection::Customers, &created.id).await.unwrap();
        assert_eq!(fetched.str_field("name"), Some("Asha"));

        let updated = store
            .update(
                Collection::Customers,
                &created.id,
                payload(json!({"city": "Indore"})),
            )
            .await
            .unwrap();
        assert_eq!(updated.str_field("city"), Some("Indore"));
        assert_eq!(updated.str_field("name"), Some("Asha"));
    }

    #[tokio::test]
    async fn test_unique_and_required() {
        let store = MemoryStore::new();
        let data = payload(json!({"name": "Asha", "mobile": "9876543210"}));
        store.create(Collection::Customers, data.clone()).await.unwrap();

        let dup = store.create(Collection::Customers, data).await.unwrap_err();
        assert!(dup.is_unique_violation());

        let missing = store
            .create(Collection::Customers, payload(json!({"name": "No Mobile"})))
            .await
            .unwrap_err();
        assert!(matches!(missing, StoreError::MissingField { .. }));
    }

    #[tokio::test]
    async fn test_invoice_numbers_may_repeat() {
        let store = MemoryStore::new();
        let invoice = payload(json!({
            "invoice_number": "GST-0001-2025/26",
            "invoice_date": "2025-06-01T10:00:00Z",
            "customer": "c1",
            "subtotal": 100,
            "grand_total": 100,
            "status": "completed",
        }));
        store.create(Collection::Invoices, invoice.clone()).await.unwrap();
        store.create(Collection::Invoices, invoice).await.unwrap();
        assert_eq!(store.count(Collection::Invoices).await, 2);
    }

    #[tokio::test]
    async fn test_list_with_expand() {
        let store = MemoryStore::new();
        let customer = store
            .create(
                Collection::Customers,
                payload(json!({"name": "Asha", "mobile": "9876543210"})),
            )
            .await
            .unwrap();
        store
            .create(
                Collection::Invoices,
                payload(json!({
                    "invoice_number": "GST-0001-2025/26",
                    "invoice_date": "2025-06-01T10:00:00Z",
                    "customer": customer.id,
                    "subtotal": 100,
                    "grand_total": 100,
                    "status": "completed",
                })),
            )
            .await
            .unwrap();

        let query = ListQuery::new(Filter::eq("status", "completed")).expand(&["customer"]);
        let page = store.list(Collection::Invoices, &query).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(
            page.items[0].expand.get("customer").map(|c| c.id.clone()),
            Some(customer.id)
        );
    }

    #[tokio::test]
    async fn test_concurrent_counter_increments_are_distinct() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.increment_counter("invoice_counter").await.unwrap()
            }));
        }
        let mut values = Vec::new();
        for handle in handles {
            values.push(handle.await.unwrap());
        }
        values.sort_unstable();
        assert_eq!(values, (1..=20).collect::<Vec<u64>>());
    }
}
