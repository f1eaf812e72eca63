//! Supplier repository.

use tracing::debug;

use dukaan_core::Supplier;

use crate::error::StoreResult;
use crate::record::{encode, Collection, Filter, ListQuery, ListResult};
use crate::store::SharedStore;

#[derive(Debug, Clone)]
pub struct SupplierRepository {
    store: SharedStore,
}

impl SupplierRepository {
    pub fn new(store: SharedStore) -> Self {
        SupplierRepository { store }
    }

    pub async fn get(&self, id: &str) -> StoreResult<Supplier> {
        self.store.get(Collection::Suppliers, id).await?.decode()
    }

    pub async fn find_by_code(&self, code: &str) -> StoreResult<Option<Supplier>> {
        self.store
            .first(Collection::Suppliers, Filter::eq("supplier_code", code.trim()), "")
            .await?
            .map(|r| r.decode())
            .transpose()
    }

    pub async fn create(&self, supplier: &Supplier) -> StoreResult<Supplier> {
        debug!(code = %supplier.supplier_code, "Creating supplier");
        self.store
            .create(Collection::Suppliers, encode(supplier)?)
            .await?
            .decode()
    }

    pub async fn update(&self, supplier: &Supplier) -> StoreResult<Supplier> {
        self.store
            .update(Collection::Suppliers, &supplier.id, encode(supplier)?)
            .await?
            .decode()
    }

    /// Lists suppliers matching name, code or city. Inactive suppliers are
    /// included only when asked for.
    pub async fn search(
        &self,
        query: &str,
        include_inactive: bool,
        page: u32,
        per_page: u32,
    ) -> StoreResult<ListResult<Supplier>> {
        let query = query.trim();
        let mut filter = if include_inactive {
            Filter::All
        } else {
            Filter::eq("active", true)
        };
        if !query.is_empty() {
            filter = filter.and(Filter::any_of(vec![
                Filter::contains("name", query),
                Filter::contains("supplier_code", query),
                Filter::contains("city", query),
            ]));
        }
        let list = ListQuery::new(filter).sort("name").page(page, per_page);
        self.store
            .list(Collection::Suppliers, &list)
            .await?
            .try_map(|r| r.decode())
    }
}
