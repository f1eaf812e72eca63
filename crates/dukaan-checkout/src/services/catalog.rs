//! # Catalog Lookups and Quick-Add
//!
//! Barcode scans and searches from the products step, plus quick-add: a
//! product created at the counter from just a name and a price.
//!
//! ```text
//! quick_add("Cotton Saree", ₹850)
//!     │
//!     ├── code = next QA- code (QA-7001, QA-7002, ...)
//!     ├── retail = mrp = ₹850, default rates, PCS, min stock 5
//!     │
//!     └── create ──► duplicate code? ──► update the existing product
//! ```

use tracing::{info, warn};

use dukaan_core::validation::{validate_name, validate_price};
use dukaan_core::{CartTotals, Money, Product, DEFAULT_UNIT};
use dukaan_store::{Database, ListResult, StoreError};

use crate::config::CheckoutConfig;
use crate::error::CheckoutResult;
use crate::state::{CartState, SettingsCache};

/// Reorder level given to quick-added products.
pub const QUICK_ADD_MIN_STOCK: i64 = 5;

#[derive(Debug, Clone)]
pub struct CatalogService {
    db: Database,
    settings: SettingsCache,
    config: CheckoutConfig,
}

impl CatalogService {
    pub fn new(db: Database, settings: SettingsCache, config: CheckoutConfig) -> Self {
        CatalogService {
            db,
            settings,
            config,
        }
    }

    /// Creates a catalog product from a name and a GST-inclusive price.
    pub async fn quick_add(
        &self,
        name: &str,
        price: Money,
        barcode: Option<&str>,
    ) -> CheckoutResult<Product> {
        let name = name.trim();
        validate_name("name", name)?;
        validate_price(price)?;

        let settings = self.settings.get(self.config.today()).await?;
        let products = self.db.products();
        let code = products.next_quick_add_code().await?;

        let mut product = Product {
            id: String::new(),
            product_code: code,
            name: name.to_string(),
            description: None,
            hsn_code: None,
            purchase_price: None,
            retail_price: price,
            mrp: price,
            wholesale_price: None,
            cgst_pct: Some(settings.default_cgst),
            sgst_pct: Some(settings.default_sgst),
            unit: Some(DEFAULT_UNIT.to_string()),
            barcode: barcode
                .map(str::trim)
                .filter(|b| !b.is_empty())
                .map(str::to_string),
            min_stock: QUICK_ADD_MIN_STOCK,
            current_stock: 0,
            active: true,
        };

        match products.create(&product).await {
            Ok(created) => {
                info!(code = %created.product_code, id = %created.id, price = %price, "Product quick-added");
                Ok(created)
            }
            Err(e) if e.is_unique_violation() => {
                // Another terminal took the code between read and create
                warn!(code = %product.product_code, "Quick-add code taken, updating existing product");
                let existing = products
                    .find_by_code(&product.product_code)
                    .await?
                    .ok_or_else(|| StoreError::not_found("products", product.product_code.as_str()))?;
                product.id = existing.id;
                product.current_stock = existing.current_stock;
                Ok(products.update(&product).await?)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Quick-adds a product and puts one unit in the cart.
    pub async fn quick_add_to_cart(
        &self,
        cart: &CartState,
        name: &str,
        price: Money,
        barcode: Option<&str>,
    ) -> CheckoutResult<(Product, CartTotals)> {
        let product = self.quick_add(name, price, barcode).await?;
        let totals = cart.update(|c| {
            c.add_item(&product);
            CartTotals::from(&*c)
        })?;
        Ok((product, totals))
    }

    /// Finds the product for a scanned code: barcode first, then
    /// product code.
    pub async fn scan(&self, code: &str) -> CheckoutResult<Option<Product>> {
        let products = self.db.products();
        if let Some(product) = products.find_by_barcode(code).await? {
            return Ok(Some(product));
        }
        Ok(products.find_by_code(code).await?)
    }

    /// Scans a code and adds the product to the cart. Returns `None` when
    /// nothing matched.
    pub async fn scan_into_cart(
        &self,
        cart: &CartState,
        code: &str,
    ) -> CheckoutResult<Option<Product>> {
        let Some(product) = self.scan(code).await? else {
            return Ok(None);
        };
        cart.update(|c| c.add_item(&product))?;
        Ok(Some(product))
    }

    pub async fn search(
        &self,
        query: &str,
        page: u32,
        per_page: u32,
    ) -> CheckoutResult<ListResult<Product>> {
        Ok(self.db.products().search(query, page, per_page).await?)
    }
}
