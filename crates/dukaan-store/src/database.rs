//! # Database Handle
//!
//! One handle per session, cheap to clone. Hands out typed repositories
//! over whichever backend it was opened with.
//!
//! ```rust,ignore
//! let db = Database::sqlite(DbConfig::new("dukaan.db")).await?;
//! let product = db.products().find_by_code("SAR-001").await?;
//! ```

use std::sync::Arc;
use tracing::info;

use crate::error::StoreResult;
use crate::memory::MemoryStore;
use crate::pool::{DbConfig, SqliteStore};
use crate::repository::customer::CustomerRepository;
use crate::repository::invoice::InvoiceRepository;
use crate::repository::product::ProductRepository;
use crate::repository::settings::SettingsRepository;
use crate::repository::stock::StockRepository;
use crate::repository::supplier::SupplierRepository;
use crate::store::SharedStore;

/// Typed access to the record store.
#[derive(Debug, Clone)]
pub struct Database {
    store: SharedStore,
}

impl Database {
    /// Wraps an existing backend.
    pub fn new(store: SharedStore) -> Self {
        Database { store }
    }

    /// Fresh in-memory backend.
    pub fn memory() -> Self {
        Database::new(Arc::new(MemoryStore::new()))
    }

    /// Opens the SQLite backend, running migrations when configured to.
    pub async fn sqlite(config: DbConfig) -> StoreResult<Self> {
        let store = SqliteStore::connect(config).await?;
        info!("SQLite record store ready");
        Ok(Database::new(Arc::new(store)))
    }

    /// The underlying backend.
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.store.clone())
    }

    pub fn customers(&self) -> CustomerRepository {
        CustomerRepository::new(self.store.clone())
    }

    pub fn suppliers(&self) -> SupplierRepository {
        SupplierRepository::new(self.store.clone())
    }

    pub fn invoices(&self) -> InvoiceRepository {
        InvoiceRepository::new(self.store.clone())
    }

    pub fn stock(&self) -> StockRepository {
        StockRepository::new(self.store.clone())
    }

    pub fn settings(&self) -> SettingsRepository {
        SettingsRepository::new(self.store.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_repositories_share_one_backend() {
        let db = Database::memory();
        db.settings().set("shop_name", "Harda Sarees", Some("shop")).await.unwrap();

        let other = db.clone();
        let value = other.settings().get("shop_name").await.unwrap();
        assert_eq!(value.map(|s| s.value), Some("Harda Sarees".to_string()));
    }

    #[tokio::test]
    async fn test_sqlite_backend_opens() {
        let db = Database::sqlite(DbConfig::in_memory()).await.unwrap();
        assert_eq!(db.settings().seed_defaults().await.unwrap(), 12);
        assert_eq!(db.settings().invoice_counter().await.unwrap(), 0);
    }
}
