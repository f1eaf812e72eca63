//! # Product Repository
//!
//! Catalog lookups, quick-add codes and stock levels.
//!
//! ## Stock Listings
//! ```text
//! low stock       active && 0 <= current_stock < min_stock
//! negative stock  active && current_stock < 0
//! ```

use serde_json::Value;
use tracing::debug;

use dukaan_core::Product;

use crate::error::StoreResult;
use crate::record::{encode, Collection, Filter, ListQuery, ListResult, MAX_PER_PAGE};
use crate::store::SharedStore;

/// Prefix of codes assigned by quick-add.
pub const QUICK_ADD_PREFIX: &str = "QA-";

/// First quick-add code number.
pub const QUICK_ADD_FIRST: u64 = 7001;

/// Repository for catalog products.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    store: SharedStore,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(store: SharedStore) -> Self {
        ProductRepository { store }
    }

    /// Gets a product by record id.
    pub async fn get(&self, id: &str) -> StoreResult<Product> {
        self.store.get(Collection::Products, id).await?.decode()
    }

    /// Finds a product by its product code.
    pub async fn find_by_code(&self, code: &str) -> StoreResult<Option<Product>> {
        self.store
            .first(Collection::Products, Filter::eq("product_code", code.trim()), "")
            .await?
            .map(|r| r.decode())
            .transpose()
    }

    /// Finds a product by barcode.
    pub async fn find_by_barcode(&self, barcode: &str) -> StoreResult<Option<Product>> {
        let barcode = barcode.trim();
        if barcode.is_empty() {
            return Ok(None);
        }
        self.store
            .first(Collection::Products, Filter::eq("barcode", barcode), "")
            .await?
            .map(|r| r.decode())
            .transpose()
    }

    /// Searches name, code and barcode. An empty query lists everything.
    pub async fn search(&self, query: &str, page: u32, per_page: u32) -> StoreResult<ListResult<Product>> {
        let query = query.trim();
        debug!(query = %query, page, "Searching products");

        let filter = if query.is_empty() {
            Filter::All
        } else {
            Filter::any_of(vec![
                Filter::contains("name", query),
                Filter::contains("product_code", query),
                Filter::contains("barcode", query),
            ])
        };
        let list = ListQuery::new(filter).sort("name").page(page, per_page);
        self.store
            .list(Collection::Products, &list)
            .await?
            .try_map(|r| r.decode())
    }

    /// Inserts a product. The returned copy carries the new id.
    pub async fn create(&self, product: &Product) -> StoreResult<Product> {
        debug!(code = %product.product_code, "Creating product");
        self.store
            .create(Collection::Products, encode(product)?)
            .await?
            .decode()
    }

    /// Overwrites a product's fields.
    pub async fn update(&self, product: &Product) -> StoreResult<Product> {
        debug!(id = %product.id, "Updating product");
        self.store
            .update(Collection::Products, &product.id, encode(product)?)
            .await?
            .decode()
    }

    /// Sets `current_stock` to an absolute value.
    pub async fn set_stock(&self, id: &str, current_stock: i64) -> StoreResult<Product> {
        debug!(id = %id, current_stock, "Setting stock");
        let mut patch = serde_json::Map::new();
        patch.insert("current_stock".to_string(), Value::from(current_stock));
        self.store
            .update(Collection::Products, id, patch)
            .await?
            .decode()
    }

    /// Next free quick-add code, e.g. `QA-7001`.
    pub async fn next_quick_add_code(&self) -> StoreResult<String> {
        let records = self
            .store
            .list_all(
                Collection::Products,
                Filter::contains("product_code", QUICK_ADD_PREFIX),
                "",
            )
            .await?;

        let highest = records
            .iter()
            .filter_map(|r| r.str_field("product_code"))
            .filter_map(|code| code.strip_prefix(QUICK_ADD_PREFIX)?.parse::<u64>().ok())
            .max();

        let next = highest.map_or(QUICK_ADD_FIRST, |n| (n + 1).max(QUICK_ADD_FIRST));
        Ok(format!("{}{}", QUICK_ADD_PREFIX, next))
    }

    /// Active products below their reorder level but not negative.
    pub async fn low_stock(&self, page: u32, per_page: u32) -> StoreResult<ListResult<Product>> {
        let filter = Filter::eq("active", true).and(Filter::gte("current_stock", 0));
        self.stock_listing(filter, Product::is_low_stock, page, per_page)
            .await
    }

    /// Active products with negative stock.
    pub async fn negative_stock(&self, page: u32, per_page: u32) -> StoreResult<ListResult<Product>> {
        let filter = Filter::eq("active", true).and(Filter::lt("current_stock", 0));
        self.stock_listing(filter, |_| true, page, per_page).await
    }

    async fn stock_listing(
        &self,
        filter: Filter,
        keep: fn(&Product) -> bool,
        page: u32,
        per_page: u32,
    ) -> StoreResult<ListResult<Product>> {
        // min_stock differs per product, so the threshold runs after decode
        let records = self
            .store
            .list_all(Collection::Products, filter, "current_stock,name")
            .await?;
        let mut matched = Vec::new();
        for record in &records {
            let product: Product = record.decode()?;
            if keep(&product) {
                matched.push(product);
            }
        }

        let total_items = matched.len() as u64;
        let per_page = per_page.clamp(1, MAX_PER_PAGE);
        let page = page.max(1);
        Ok(ListResult {
            items: matched
                .into_iter()
                .skip((page as usize - 1) * per_page as usize)
                .take(per_page as usize)
                .collect(),
            page,
            per_page,
            total_items,
            total_pages: total_items.div_ceil(u64::from(per_page)),
        })
    }
}
