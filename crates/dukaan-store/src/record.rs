//! # Records, Collections and Queries
//!
//! The record store keeps schemaless JSON payloads grouped into named
//! collections. Each collection declares which fields are required, which
//! are unique, and which point at records in another collection.
//!
//! ## Collections
//! ```text
//! ┌──────────────────┬──────────────────────────┬──────────────────────────┐
//! │ collection       │ unique                   │ relations                │
//! ├──────────────────┼──────────────────────────┼──────────────────────────┤
//! │ products         │ product_code             │                          │
//! │ suppliers        │ supplier_code            │                          │
//! │ customers        │ mobile                   │                          │
//! │ invoices         │ (invoice_number shared   │ customer → customers     │
//! │                  │  by revisions)           │ created_by → users       │
//! │ invoice_items    │                          │ invoice → invoices       │
//! │                  │                          │ product → products       │
//! │ stock_movements  │                          │ product → products       │
//! │ settings         │ key                      │                          │
//! │ users            │ email                    │                          │
//! └──────────────────┴──────────────────────────┴──────────────────────────┘
//! ```
//!
//! ## Queries
//! Filters are a typed expression tree evaluated against decoded payloads.
//! Both backends evaluate them in process; collection sizes for one shop
//! stay small enough for that.

use chrono::{DateTime, FixedOffset, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};

// =============================================================================
// Collections
// =============================================================================

/// Named group of records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Products,
    Suppliers,
    Customers,
    Invoices,
    InvoiceItems,
    StockMovements,
    Settings,
    Users,
}

/// Field rules for one collection.
#[derive(Debug, Clone, Copy)]
pub struct CollectionSchema {
    /// Must be present, non-null and, for strings, non-blank.
    pub required: &'static [&'static str],
    /// No two records may share a value.
    pub unique: &'static [&'static str],
    /// Relation fields and the collection they point into.
    pub relations: &'static [(&'static str, Collection)],
}

impl Collection {
    pub const ALL: [Collection; 8] = [
        Collection::Products,
        Collection::Suppliers,
        Collection::Customers,
        Collection::Invoices,
        Collection::InvoiceItems,
        Collection::StockMovements,
        Collection::Settings,
        Collection::Users,
    ];

    /// Stored collection name.
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Products => "products",
            Collection::Suppliers => "suppliers",
            Collection::Customers => "customers",
            Collection::Invoices => "invoices",
            Collection::InvoiceItems => "invoice_items",
            Collection::StockMovements => "stock_movements",
            Collection::Settings => "settings",
            Collection::Users => "users",
        }
    }

    pub fn schema(&self) -> CollectionSchema {
        match self {
            Collection::Products => CollectionSchema {
                required: &["product_code", "name", "retail_price", "mrp"],
                unique: &["product_code"],
                relations: &[],
            },
            Collection::Suppliers => CollectionSchema {
                required: &["supplier_code", "name"],
                unique: &["supplier_code"],
                relations: &[],
            },
            Collection::Customers => CollectionSchema {
                required: &["name", "mobile"],
                unique: &["mobile"],
                relations: &[],
            },
            Collection::Invoices => CollectionSchema {
                required: &[
                    "invoice_number",
                    "invoice_date",
                    "customer",
                    "subtotal",
                    "grand_total",
                    "status",
                ],
                unique: &[],
                relations: &[
                    ("customer", Collection::Customers),
                    ("created_by", Collection::Users),
                ],
            },
            Collection::InvoiceItems => CollectionSchema {
                required: &[
                    "invoice",
                    "product_name",
                    "quantity",
                    "unit_price",
                    "taxable_amount",
                    "total",
                ],
                unique: &[],
                relations: &[
                    ("invoice", Collection::Invoices),
                    ("product", Collection::Products),
                ],
            },
            Collection::StockMovements => CollectionSchema {
                required: &["product", "type", "quantity"],
                unique: &[],
                relations: &[("product", Collection::Products)],
            },
            Collection::Settings => CollectionSchema {
                required: &["key", "value"],
                unique: &["key"],
                relations: &[],
            },
            Collection::Users => CollectionSchema {
                required: &["email", "name"],
                unique: &["email"],
                relations: &[],
            },
        }
    }

    /// Collection a relation field points into.
    pub fn relation_target(&self, field: &str) -> Option<Collection> {
        self.schema()
            .relations
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, target)| *target)
    }

    /// Checks required fields on a full payload.
    pub fn check_required(&self, data: &Map<String, Value>) -> StoreResult<()> {
        for field in self.schema().required {
            let present = match data.get(*field) {
                None | Some(Value::Null) => false,
                Some(Value::String(s)) => !s.trim().is_empty(),
                Some(_) => true,
            };
            if !present {
                return Err(StoreError::MissingField {
                    collection: self.name().to_string(),
                    field: field.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Values of the unique fields in a payload, as comparable strings.
    /// Blank values are not constrained.
    pub fn unique_values(&self, data: &Map<String, Value>) -> Vec<(&'static str, String)> {
        self.schema()
            .unique
            .iter()
            .filter_map(|field| {
                let key = match data.get(*field)? {
                    Value::String(s) => s.trim().to_string(),
                    Value::Null => return None,
                    other => other.to_string(),
                };
                (!key.is_empty()).then_some((*field, key))
            })
            .collect()
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Collection {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .iter()
            .copied()
            .find(|c| c.name() == s)
            .ok_or_else(|| StoreError::Internal(format!("unknown collection '{}'", s)))
    }
}

// =============================================================================
// Record
// =============================================================================

/// A stored record: id, timestamps, payload and any expanded relations.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    pub collection: Collection,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub data: Map<String, Value>,
    /// Related records fetched by relation field name.
    pub expand: BTreeMap<String, Record>,
}

impl Record {
    /// Fresh record id.
    pub fn new_id() -> String {
        Uuid::new_v4().simple().to_string()
    }

    /// Raw field value. `id`, `created` and `updated` resolve to the record
    /// metadata.
    pub fn field(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(Value::String(self.id.clone())),
            "created" => Some(Value::String(self.created.to_rfc3339())),
            "updated" => Some(Value::String(self.updated.to_rfc3339())),
            _ => self.data.get(name).cloned(),
        }
    }

    /// String field, with blank strings treated as absent.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.data
            .get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Decodes the payload into a typed record, with `id` filled in.
    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<T> {
        let mut data = self.data.clone();
        data.insert("id".to_string(), Value::String(self.id.clone()));
        serde_json::from_value(Value::Object(data)).map_err(|e| StoreError::Decode {
            collection: self.collection.name().to_string(),
            id: self.id.clone(),
            reason: e.to_string(),
        })
    }

    /// Decodes an expanded relation, if it was fetched.
    pub fn decode_expand<T: DeserializeOwned>(&self, field: &str) -> StoreResult<Option<T>> {
        self.expand.get(field).map(Record::decode).transpose()
    }
}

/// Encodes a typed record into a store payload. The `id` field is dropped:
/// record identity belongs to the store.
pub fn encode<T: Serialize>(value: &T) -> StoreResult<Map<String, Value>> {
    match serde_json::to_value(value)? {
        Value::Object(mut map) => {
            map.remove("id");
            Ok(map)
        }
        other => Err(StoreError::Internal(format!(
            "record payload must be an object, got {}",
            other
        ))),
    }
}

// =============================================================================
// Filter
// =============================================================================

/// Filter expression over record fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Matches every record.
    All,
    Eq(String, Value),
    Ne(String, Value),
    Lt(String, Value),
    Lte(String, Value),
    Gt(String, Value),
    Gte(String, Value),
    /// Case-insensitive substring match on a string field.
    Contains(String, String),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Filter::Eq(field.to_string(), value.into())
    }

    pub fn ne(field: &str, value: impl Into<Value>) -> Self {
        Filter::Ne(field.to_string(), value.into())
    }

    pub fn lt(field: &str, value: impl Into<Value>) -> Self {
        Filter::Lt(field.to_string(), value.into())
    }

    pub fn lte(field: &str, value: impl Into<Value>) -> Self {
        Filter::Lte(field.to_string(), value.into())
    }

    pub fn gt(field: &str, value: impl Into<Value>) -> Self {
        Filter::Gt(field.to_string(), value.into())
    }

    pub fn gte(field: &str, value: impl Into<Value>) -> Self {
        Filter::Gte(field.to_string(), value.into())
    }

    pub fn contains(field: &str, needle: impl Into<String>) -> Self {
        Filter::Contains(field.to_string(), needle.into())
    }

    pub fn and(self, other: Filter) -> Self {
        match (self, other) {
            (Filter::All, f) | (f, Filter::All) => f,
            (Filter::And(mut parts), f) => {
                parts.push(f);
                Filter::And(parts)
            }
            (a, b) => Filter::And(vec![a, b]),
        }
    }

    pub fn any_of(filters: Vec<Filter>) -> Self {
        Filter::Or(filters)
    }

    /// Evaluates the filter against a record.
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(field, value) => {
                compare_field(record, field, value) == Some(Ordering::Equal)
            }
            Filter::Ne(field, value) => {
                compare_field(record, field, value) != Some(Ordering::Equal)
            }
            Filter::Lt(field, value) => {
                compare_field(record, field, value) == Some(Ordering::Less)
            }
            Filter::Lte(field, value) => matches!(
                compare_field(record, field, value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Filter::Gt(field, value) => {
                compare_field(record, field, value) == Some(Ordering::Greater)
            }
            Filter::Gte(field, value) => matches!(
                compare_field(record, field, value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Filter::Contains(field, needle) => match record.field(field) {
                Some(Value::String(s)) => s.to_lowercase().contains(&needle.to_lowercase()),
                _ => false,
            },
            Filter::And(parts) => parts.iter().all(|f| f.matches(record)),
            Filter::Or(parts) => parts.iter().any(|f| f.matches(record)),
        }
    }
}

fn compare_field(record: &Record, field: &str, expected: &Value) -> Option<Ordering> {
    let actual = record.field(field).unwrap_or(Value::Null);
    compare_values(&actual, expected)
}

/// Orders two JSON values. Numbers compare numerically, RFC 3339 strings
/// as instants, other strings lexically. Null equals null and blank
/// strings. Mismatched kinds do not compare.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Null, Value::String(s)) | (Value::String(s), Value::Null) if s.is_empty() => {
            Some(Ordering::Equal)
        }
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::String(x), Value::String(y)) => {
            match (parse_instant(x), parse_instant(y)) {
                (Some(dx), Some(dy)) => Some(dx.cmp(&dy)),
                _ => Some(x.cmp(y)),
            }
        }
        // Numbers stored as text by older imports
        (Value::String(x), Value::Number(y)) => x.trim().parse::<f64>().ok()?.partial_cmp(&y.as_f64()?),
        (Value::Number(x), Value::String(y)) => x.as_f64()?.partial_cmp(&y.trim().parse::<f64>().ok()?),
        _ => None,
    }
}

fn parse_instant(s: &str) -> Option<DateTime<FixedOffset>> {
    if s.len() < 20 {
        return None;
    }
    DateTime::parse_from_rfc3339(s).ok()
}

// =============================================================================
// Sort & Paging
// =============================================================================

/// Sort key. Parses `"-invoice_date"` as descending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub descending: bool,
}

impl Sort {
    pub fn asc(field: &str) -> Self {
        Sort {
            field: field.to_string(),
            descending: false,
        }
    }

    pub fn desc(field: &str) -> Self {
        Sort {
            field: field.to_string(),
            descending: true,
        }
    }

    /// Parses a comma-separated sort list such as `"-invoice_date,name"`.
    pub fn parse_list(list: &str) -> Vec<Sort> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| match s.strip_prefix('-') {
                Some(field) => Sort::desc(field),
                None => Sort::asc(s.trim_start_matches('+')),
            })
            .collect()
    }
}

/// A list request.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub filter: Filter,
    pub sort: Vec<Sort>,
    /// 1-based page number.
    pub page: u32,
    pub per_page: u32,
    /// Relation fields to expand on every returned record.
    pub expand: Vec<String>,
}

/// Page size when none is given.
pub const DEFAULT_PER_PAGE: u32 = 30;

/// Upper bound on page size.
pub const MAX_PER_PAGE: u32 = 500;

impl Default for ListQuery {
    fn default() -> Self {
        ListQuery {
            filter: Filter::All,
            sort: Vec::new(),
            page: 1,
            per_page: DEFAULT_PER_PAGE,
            expand: Vec::new(),
        }
    }
}

impl ListQuery {
    pub fn new(filter: Filter) -> Self {
        ListQuery {
            filter,
            ..ListQuery::default()
        }
    }

    pub fn sort(mut self, fields: &str) -> Self {
        self.sort = Sort::parse_list(fields);
        self
    }

    pub fn page(mut self, page: u32, per_page: u32) -> Self {
        self.page = page.max(1);
        self.per_page = per_page.clamp(1, MAX_PER_PAGE);
        self
    }

    pub fn expand(mut self, fields: &[&str]) -> Self {
        self.expand = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    /// Filters, sorts and slices a full collection scan.
    pub fn apply(&self, records: Vec<Record>) -> ListResult<Record> {
        let mut matched: Vec<Record> = records
            .into_iter()
            .filter(|r| self.filter.matches(r))
            .collect();

        if !self.sort.is_empty() {
            matched.sort_by(|a, b| {
                for key in &self.sort {
                    let av = a.field(&key.field).unwrap_or(Value::Null);
                    let bv = b.field(&key.field).unwrap_or(Value::Null);
                    let ord = compare_values(&av, &bv).unwrap_or(Ordering::Equal);
                    let ord = if key.descending { ord.reverse() } else { ord };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        }

        let total_items = matched.len() as u64;
        let per_page = self.per_page.max(1);
        let skip = (self.page.max(1) as usize - 1) * per_page as usize;
        let items = matched
            .into_iter()
            .skip(skip)
            .take(per_page as usize)
            .collect();

        ListResult {
            items,
            page: self.page.max(1),
            per_page,
            total_items,
            total_pages: total_items.div_ceil(per_page as u64),
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq)]
pub struct ListResult<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub total_pages: u64,
}

impl<T> ListResult<T> {
    /// Maps items, keeping the paging metadata.
    pub fn try_map<U, F>(self, f: F) -> StoreResult<ListResult<U>>
    where
        F: FnMut(T) -> StoreResult<U>,
    {
        Ok(ListResult {
            items: self.items.into_iter().map(f).collect::<StoreResult<Vec<U>>>()?,
            page: self.page,
            per_page: self.per_page,
            total_items: self.total_items,
            total_pages: self.total_pages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, data: Value) -> Record {
        let data = match data {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Record {
            id: id.to_string(),
            collection: Collection::Invoices,
            created: Utc::now(),
            updated: Utc::now(),
            data,
            expand: BTreeMap::new(),
        }
    }

    #[test]
    fn test_required_fields() {
        let data = json!({"name": "Asha", "mobile": "  "});
        let map = data.as_object().cloned().unwrap_or_default();
        let err = Collection::Customers.check_required(&map).unwrap_err();
        assert!(matches!(err, StoreError::MissingField { ref field, .. } if field == "mobile"));
    }

    #[test]
    fn test_invoice_number_is_not_unique() {
        let map = json!({"invoice_number": "GST-0001-2025/26"})
            .as_object()
            .cloned()
            .unwrap_or_default();
        assert!(Collection::Invoices.unique_values(&map).is_empty());
        assert_eq!(
            Collection::Settings.unique_values(&json!({"key": "x"}).as_object().cloned().unwrap()),
            vec![("key", "x".to_string())]
        );
    }

    #[test]
    fn test_filter_operators() {
        let r = record(
            "a",
            json!({"status": "completed", "grand_total": 2975.0, "notes": "Paid by UPI"}),
        );
        assert!(Filter::eq("status", "completed").matches(&r));
        assert!(Filter::ne("status", "revised").matches(&r));
        assert!(Filter::gt("grand_total", 100).matches(&r));
        assert!(Filter::lte("grand_total", 2975).matches(&r));
        assert!(!Filter::lt("grand_total", 2975).matches(&r));
        assert!(Filter::contains("notes", "upi").matches(&r));
        assert!(Filter::any_of(vec![Filter::eq("status", "draft"), Filter::eq("id", "a")]).matches(&r));
        assert!(!Filter::eq("status", "completed").and(Filter::eq("id", "b")).matches(&r));
    }

    #[test]
    fn test_missing_field_equals_null_and_blank() {
        let r = record("a", json!({"product": ""}));
        assert!(Filter::eq("product", Value::Null).matches(&r));
        assert!(Filter::eq("missing", Value::Null).matches(&r));
        assert!(Filter::ne("product", "p1").matches(&r));
    }

    #[test]
    fn test_dates_compare_as_instants() {
        let r = record("a", json!({"invoice_date": "2025-04-01T10:00:00.250Z"}));
        assert!(Filter::gt("invoice_date", "2025-04-01T10:00:00Z").matches(&r));
        assert!(!Filter::lt("invoice_date", "2025-04-01T15:30:00+05:30").matches(&r));
        assert!(Filter::lt("invoice_date", "2025-04-01T15:31:00+05:30").matches(&r));
    }

    #[test]
    fn test_sort_and_paging() {
        let records = (1..=5)
            .map(|n| record(&format!("r{}", n), json!({"n": n, "group": n % 2})))
            .collect::<Vec<_>>();
        let result = ListQuery::default()
            .sort("-group,n")
            .page(1, 2)
            .apply(records);
        let ids: Vec<&str> = result.items.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r1", "r3"]);
        assert_eq!(result.total_items, 5);
        assert_eq!(result.total_pages, 3);
    }

    #[test]
    fn test_decode_fills_id() {
        #[derive(Debug, serde::Deserialize)]
        struct Row {
            id: String,
            status: String,
        }
        let row: Row = record("abc", json!({"status": "draft"})).decode().unwrap();
        assert_eq!(row.id, "abc");
        assert_eq!(row.status, "draft");

        let err = record("abc", json!({})).decode::<Row>().unwrap_err();
        assert!(matches!(err, StoreError::Decode { .. }));
    }
}
