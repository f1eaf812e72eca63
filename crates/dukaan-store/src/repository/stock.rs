//! # Stock Movement Repository
//!
//! The append-only inventory ledger. Movements are never updated.

use tracing::debug;

use dukaan_core::{Product, StockMovement};

use crate::error::StoreResult;
use crate::record::{encode, Collection, Filter, ListQuery, ListResult};
use crate::store::SharedStore;

/// A movement with its product, when the product still exists.
#[derive(Debug, Clone, PartialEq)]
pub struct MovementWithProduct {
    pub movement: StockMovement,
    pub product: Option<Product>,
}

#[derive(Debug, Clone)]
pub struct StockRepository {
    store: SharedStore,
}

impl StockRepository {
    pub fn new(store: SharedStore) -> Self {
        StockRepository { store }
    }

    /// Appends a movement to the ledger.
    pub async fn record(&self, movement: &StockMovement) -> StoreResult<StockMovement> {
        debug!(
            product = %movement.product,
            kind = movement.movement_type.as_str(),
            quantity = movement.quantity,
            "Recording stock movement"
        );
        self.store
            .create(Collection::StockMovements, encode(movement)?)
            .await?
            .decode()
    }

    /// Movements for one product, newest first.
    pub async fn list_for_product(
        &self,
        product_id: &str,
        page: u32,
        per_page: u32,
    ) -> StoreResult<ListResult<StockMovement>> {
        let list = ListQuery::new(Filter::eq("product", product_id))
            .sort("-created")
            .page(page, per_page);
        self.store
            .list(Collection::StockMovements, &list)
            .await?
            .try_map(|r| r.decode())
    }

    /// Movements referencing a document, e.g. every line of one invoice.
    pub async fn list_for_reference(&self, reference_id: &str) -> StoreResult<Vec<StockMovement>> {
        self.store
            .list_all(
                Collection::StockMovements,
                Filter::eq("reference_id", reference_id),
                "created",
            )
            .await?
            .iter()
            .map(|r| r.decode())
            .collect()
    }

    /// Latest movements across all products, with products expanded.
    pub async fn list_recent(&self, page: u32, per_page: u32) -> StoreResult<ListResult<MovementWithProduct>> {
        let list = ListQuery::default()
            .sort("-created")
            .page(page, per_page)
            .expand(&["product"]);
        self.store
            .list(Collection::StockMovements, &list)
            .await?
            .try_map(|r| {
                Ok(MovementWithProduct {
                    product: r.decode_expand("product")?,
                    movement: r.decode()?,
                })
            })
    }
}
