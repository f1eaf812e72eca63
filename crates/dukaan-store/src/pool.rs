//! # SQLite Backend
//!
//! Connection pool creation and the SQLite [`RecordStore`].
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      SQLite Record Store                                │
//! │                                                                         │
//! │  Terminal startup                                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::new(path) ← Configure pool settings                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SqliteStore::connect(config).await ← Create pool + run migrations     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌──────────────────────────────┐   ┌──────────────────────────────┐   │
//! │  │ records                      │   │ record_uniques               │   │
//! │  │ id | collection | data(JSON) │◄──│ collection | field | value   │   │
//! │  │    | created | updated       │   │ PRIMARY KEY enforces unique  │   │
//! │  └──────────────────────────────┘   └──────────────────────────────┘   │
//! │                                                                         │
//! │  Writes run in a transaction: payload row + unique rows together.      │
//! │  The invoice counter is a single UPDATE ... RETURNING.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! SQLite WAL (Write-Ahead Logging) mode is enabled so report reads do not
//! block a checkout in progress.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::memory::counter_value;
use crate::migrations;
use crate::record::{Collection, ListQuery, ListResult, Record};
use crate::store::RecordStore;

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/path/to/dukaan.db")
///     .max_connections(5)
///     .min_connections(1);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file, or `:memory:`.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// Connection timeout duration.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection.
    /// Default: 10 minutes
    pub idle_timeout: Duration,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    /// Creates a new database configuration with the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            run_migrations: true,
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Creates an in-memory database configuration (for testing).
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1, // In-memory requires single connection
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            run_migrations: true,
        }
    }

    fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == ":memory:"
    }
}

// =============================================================================
// Store
// =============================================================================

/// SQLite-backed record store.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

type RecordRow = (String, String, String, String);

impl SqliteStore {
    /// Opens the pool and runs migrations if enabled.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Configures WAL mode, NORMAL synchronous and foreign keys
    /// 3. Creates the connection pool
    /// 4. Runs migrations (if enabled)
    pub async fn connect(config: DbConfig) -> StoreResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing record store"
        );

        let in_memory = config.is_in_memory();
        let connect_options = (if in_memory {
            SqliteConnectOptions::from_str("sqlite::memory:")
        } else {
            SqliteConnectOptions::from_str(&format!(
                "sqlite://{}?mode=rwc",
                config.database_path.display()
            ))
        })
        .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .create_if_missing(true);

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout);

        // An in-memory database lives exactly as long as its connection
        pool_options = if in_memory {
            pool_options.idle_timeout(None).max_lifetime(None)
        } else {
            pool_options.idle_timeout(Some(config.idle_timeout))
        };

        let pool = pool_options
            .connect_with(connect_options)
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        info!(max_connections = config.max_connections, "Record store pool created");

        let store = SqliteStore { pool };
        if config.run_migrations {
            store.run_migrations().await?;
        }
        Ok(store)
    }

    /// Applies pending migrations.
    pub async fn run_migrations(&self) -> StoreResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Closes the pool. Later calls fail.
    pub async fn close(&self) {
        info!("Closing record store pool");
        self.pool.close().await;
    }

    /// Checks the database answers queries.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    async fn fetch_row(
        tx: &mut Transaction<'_, Sqlite>,
        collection: Collection,
        id: &str,
    ) -> StoreResult<RecordRow> {
        sqlx::query_as::<_, RecordRow>(
            "SELECT id, data, created, updated FROM records WHERE collection = ?1 AND id = ?2",
        )
        .bind(collection.name())
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| StoreError::not_found(collection.name(), id))
    }

    /// Replaces the unique-index rows of one record.
    async fn write_uniques(
        tx: &mut Transaction<'_, Sqlite>,
        collection: Collection,
        id: &str,
        data: &Map<String, Value>,
    ) -> StoreResult<()> {
        sqlx::query("DELETE FROM record_uniques WHERE record_id = ?1")
            .bind(id)
            .execute(&mut **tx)
            .await?;

        for (field, value) in collection.unique_values(data) {
            sqlx::query(
                "INSERT INTO record_uniques (collection, field, value, record_id) VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(collection.name())
            .bind(field)
            .bind(&value)
            .bind(id)
            .execute(&mut **tx)
            .await
            .map_err(|e| match StoreError::from(e) {
                StoreError::UniqueViolation { .. } => StoreError::duplicate(field, value.clone()),
                other => other,
            })?;
        }
        Ok(())
    }
}

fn decode_row(collection: Collection, row: RecordRow) -> StoreResult<Record> {
    let (id, data, created, updated) = row;
    let data = match serde_json::from_str::<Value>(&data)? {
        Value::Object(map) => map,
        _ => {
            return Err(StoreError::Decode {
                collection: collection.name().to_string(),
                id,
                reason: "payload is not an object".to_string(),
            })
        }
    };
    Ok(Record {
        created: parse_timestamp(collection, &id, &created)?,
        updated: parse_timestamp(collection, &id, &updated)?,
        id,
        collection,
        data,
        expand: BTreeMap::new(),
    })
}

/// Fixed-width RFC 3339 so stored timestamps sort lexically.
fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(collection: Collection, id: &str, raw: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Decode {
            collection: collection.name().to_string(),
            id: id.to_string(),
            reason: format!("bad timestamp '{}': {}", raw, e),
        })
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn create(&self, collection: Collection, data: Map<String, Value>) -> StoreResult<Record> {
        collection.check_required(&data)?;

        let id = Record::new_id();
        let now = Utc::now();
        let payload = serde_json::to_string(&data)?;

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO records (id, collection, data, created, updated) VALUES (?1, ?2, ?3, ?4, ?4)",
        )
        .bind(&id)
        .bind(collection.name())
        .bind(&payload)
        .bind(timestamp(&now))
        .execute(&mut *tx)
        .await?;
        Self::write_uniques(&mut tx, collection, &id, &data).await?;
        tx.commit().await?;

        debug!(collection = %collection, id = %id, "Record created");
        Ok(Record {
            id,
            collection,
            created: now,
            updated: now,
            data,
            expand: BTreeMap::new(),
        })
    }

    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Record> {
        let row = sqlx::query_as::<_, RecordRow>(
            "SELECT id, data, created, updated FROM records WHERE collection = ?1 AND id = ?2",
        )
        .bind(collection.name())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found(collection.name(), id))?;
        decode_row(collection, row)
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        patch: Map<String, Value>,
    ) -> StoreResult<Record> {
        let mut tx = self.pool.begin().await?;
        let mut record = decode_row(collection, Self::fetch_row(&mut tx, collection, id).await?)?;

        for (key, value) in patch {
            if value.is_null() {
                record.data.remove(&key);
            } else {
                record.data.insert(key, value);
            }
        }
        collection.check_required(&record.data)?;

        record.updated = Utc::now();
        sqlx::query("UPDATE records SET data = ?1, updated = ?2 WHERE id = ?3")
            .bind(serde_json::to_string(&record.data)?)
            .bind(timestamp(&record.updated))
            .bind(id)
            .execute(&mut *tx)
            .await?;
        Self::write_uniques(&mut tx, collection, id, &record.data).await?;
        tx.commit().await?;

        debug!(collection = %collection, id = %id, "Record updated");
        Ok(record)
    }

    async fn list(&self, collection: Collection, query: &ListQuery) -> StoreResult<ListResult<Record>> {
        let rows = sqlx::query_as::<_, RecordRow>(
            "SELECT id, data, created, updated FROM records WHERE collection = ?1 ORDER BY created, id",
        )
        .bind(collection.name())
        .fetch_all(&self.pool)
        .await?;

        let records = rows
            .into_iter()
            .map(|row| decode_row(collection, row))
            .collect::<StoreResult<Vec<_>>>()?;

        let page = query.apply(records);
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
        const INCREMENT: &str = r#"
            UPDATE records
            SET data = json_set(
                    data,
                    '$.value',
                    CAST(COALESCE(CAST(json_extract(data, '$.value') AS INTEGER), 0) + 1 AS TEXT)
                ),
                updated = ?1
            WHERE collection = 'settings' AND json_extract(data, '$.key') = ?2
            RETURNING id, data, created, updated
        "#;

        for _ in 0..2 {
            let row = sqlx::query_as::<_, RecordRow>(INCREMENT)
                .bind(timestamp(&Utc::now()))
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

            if let Some(row) = row {
                let value = counter_value(&decode_row(Collection::Settings, row)?)?;
                debug!(key = %key, value, "Counter incremented");
                return Ok(value);
            }

            let mut data = Map::new();
            data.insert("key".to_string(), Value::String(key.to_string()));
            data.insert("value".to_string(), Value::String("1".to_string()));
            data.insert("category".to_string(), Value::String("invoice".to_string()));
            match self.create(Collection::Settings, data).await {
                Ok(_) => return Ok(1),
                // Another terminal created it first; increment theirs
                Err(e) if e.is_unique_violation() => {
                    warn!(key = %key, "Counter created concurrently, retrying increment");
                }
                Err(e) => return Err(e),
            }
        }
        Err(StoreError::Internal(format!("counter '{}' could not be incremented", key)))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Filter;
    use serde_json::json;

    fn payload(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    async fn store() -> SqliteStore {
        SqliteStore::connect(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_in_memory_store() {
        assert!(store().await.health_check().await);
    }

    #[tokio::test]
    async fn test_config_builder() {
        let config = DbConfig::new("/tmp/test.db")
            .max_connections(10)
            .min_connections(2);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert!(!config.is_in_memory());
        assert!(DbConfig::in_memory().is_in_memory());
    }

    #[tokio::test]
    async fn test_round_trip_and_unique_codes() {
        let store = store().await;
        let created = store
            .create(
                Collection::Products,
                payload(json!({
                    "product_code": "QA-7001",
                    "name": "Cotton Saree",
                    "retail_price": 850.5,
                    "mrp": 850.5,
                })),
            )
            .await
            .unwrap();

        let fetched = store.get(Collection::Products, &created.id).await.unwrap();
        assert_eq!(fetched.data, created.data);

        let dup = store
            .create(
                Collection::Products,
                payload(json!({
                    "product_code": "QA-7001",
                    "name": "Other",
                    "retail_price": 1,
                    "mrp": 1,
                })),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            dup,
            StoreError::UniqueViolation { ref field, ref value } if field == "product_code" && value == "QA-7001"
        ));
    }

    #[tokio::test]
    async fn test_update_moves_unique_value() {
        let store = store().await;
        let a = store
            .create(Collection::Customers, payload(json!({"name": "A", "mobile": "9000000001"})))
            .await
            .unwrap();
        store
            .update(Collection::Customers, &a.id, payload(json!({"mobile": "9000000002"})))
            .await
            .unwrap();

        // Old number is free again
        store
            .create(Collection::Customers, payload(json!({"name": "B", "mobile": "9000000001"})))
            .await
            .unwrap();
        let taken = store
            .create(Collection::Customers, payload(json!({"name": "C", "mobile": "9000000002"})))
            .await
            .unwrap_err();
        assert!(taken.is_unique_violation());
    }

    #[tokio::test]
    async fn test_list_filters_and_sorts() {
        let store = store().await;
        for (code, stock) in [("A", 3), ("B", -1), ("C", 8)] {
            store
                .create(
                    Collection::Products,
                    payload(json!({
                        "product_code": code,
                        "name": code,
                        "retail_price": 10,
                        "mrp": 10,
                        "current_stock": stock,
                    })),
                )
                .await
                .unwrap();
        }
        let query = ListQuery::new(Filter::gte("current_stock", 0)).sort("-current_stock");
        let page = store.list(Collection::Products, &query).await.unwrap();
        let codes: Vec<&str> = page
            .items
            .iter()
            .filter_map(|r| r.str_field("product_code"))
            .collect();
        assert_eq!(codes, vec!["C", "A"]);
    }

    #[tokio::test]
    async fn test_counter_increment_and_create() {
        let store = store().await;
        assert_eq!(store.increment_counter("invoice_counter").await.unwrap(), 1);
        assert_eq!(store.increment_counter("invoice_counter").await.unwrap(), 2);

        let setting = store
            .first(Collection::Settings, Filter::eq("key", "invoice_counter"), "")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(setting.str_field("value"), Some("2"));
    }
}
