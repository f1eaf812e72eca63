//! # Stock Ledger
//!
//! Every change to `current_stock` goes through here and leaves a
//! `stock_movements` row carrying the balance it produced.
//!
//! ## Movement Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Source                 type         quantity   reference               │
//! │  ──────                 ────         ────────   ─────────               │
//! │  Invoice line saved     sale         -qty       invoice / <id>          │
//! │  Invoice revised        return       +qty       invoice / <old id>      │
//! │  Stock screen           adjustment   ±qty       -                       │
//! │                         purchase     +qty                               │
//! │                         opening      ±qty                               │
//! │                         return       +qty                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Balances are read-then-written without a transaction. Two terminals
//! selling the same product at the same moment can lose one decrement;
//! the movement rows still record both sales.

use tracing::{debug, info, warn};

use dukaan_core::validation::validate_stock_change;
use dukaan_core::{Invoice, InvoiceLineItem, MovementType, Product, StockMovement, ValidationError};
use dukaan_store::{Database, ListResult, MovementWithProduct};

use crate::error::CheckoutResult;

/// `reference_type` of movements written for invoices.
pub const INVOICE_REFERENCE: &str = "invoice";

#[derive(Debug, Clone)]
pub struct StockService {
    db: Database,
}

impl StockService {
    pub fn new(db: Database) -> Self {
        StockService { db }
    }

    // =========================================================================
    // Invoice Hooks
    // =========================================================================

    /// Takes one saved invoice line out of stock.
    ///
    /// Skipped for ad-hoc lines, non-positive quantities, imported
    /// invoices and products that no longer exist.
    pub async fn record_sale(
        &self,
        invoice: &Invoice,
        line: &InvoiceLineItem,
    ) -> CheckoutResult<Option<StockMovement>> {
        if invoice.is_import() {
            return Ok(None);
        }
        let Some(product_id) = line.product.as_deref() else {
            return Ok(None);
        };
        if line.quantity <= 0 {
            return Ok(None);
        }

        self.apply_if_exists(
            product_id,
            -line.quantity,
            MovementType::Sale,
            Some(&invoice.id),
            None,
        )
        .await
    }

    /// Puts the lines of a superseded invoice back into stock.
    /// Returns the number of movements written.
    pub async fn return_lines(
        &self,
        superseded: &Invoice,
        lines: &[InvoiceLineItem],
    ) -> CheckoutResult<usize> {
        if superseded.is_import() {
            return Ok(0);
        }
        let note = format!("Revised {}", superseded.invoice_number);
        let mut written = 0;
        for line in lines {
            let Some(product_id) = line.product.as_deref() else {
                continue;
            };
            if line.quantity <= 0 {
                continue;
            }
            let movement = self
                .apply_if_exists(
                    product_id,
                    line.quantity,
                    MovementType::Return,
                    Some(&superseded.id),
                    Some(&note),
                )
                .await?;
            if movement.is_some() {
                written += 1;
            }
        }
        debug!(invoice = %superseded.id, written, "Superseded lines returned to stock");
        Ok(written)
    }

    // =========================================================================
    // Manual Adjustment
    // =========================================================================

    /// Applies a signed manual change from the stock screen.
    pub async fn adjust(
        &self,
        product_id: &str,
        movement_type: MovementType,
        quantity: i64,
        note: Option<&str>,
    ) -> CheckoutResult<Product> {
        validate_stock_change(quantity)?;
        if movement_type == MovementType::Sale {
            return Err(ValidationError::NotAllowed {
                field: "type".to_string(),
                allowed: [
                    MovementType::Adjustment,
                    MovementType::Purchase,
                    MovementType::Opening,
                    MovementType::Return,
                ]
                .iter()
                .map(|t| t.as_str().to_string())
                .collect(),
            }
            .into());
        }

        let product = self.db.products().get(product_id).await?;
        let note = note.map(str::trim).filter(|n| !n.is_empty());
        let (updated, _) = self
            .apply(product, quantity, movement_type, None, note)
            .await?;
        info!(
            product = %updated.product_code,
            kind = %movement_type.as_str(),
            quantity,
            balance = updated.current_stock,
            "Stock adjusted"
        );
        Ok(updated)
    }

    // =========================================================================
    // Listings
    // =========================================================================

    pub async fn low_stock(&self, page: u32, per_page: u32) -> CheckoutResult<ListResult<Product>> {
        Ok(self.db.products().low_stock(page, per_page).await?)
    }

    pub async fn negative_stock(
        &self,
        page: u32,
        per_page: u32,
    ) -> CheckoutResult<ListResult<Product>> {
        Ok(self.db.products().negative_stock(page, per_page).await?)
    }

    /// Movement history of one product, newest first.
    pub async fn history(
        &self,
        product_id: &str,
        page: u32,
        per_page: u32,
    ) -> CheckoutResult<ListResult<StockMovement>> {
        Ok(self
            .db
            .stock()
            .list_for_product(product_id, page, per_page)
            .await?)
    }

    /// Latest movements across the catalog.
    pub async fn recent(
        &self,
        page: u32,
        per_page: u32,
    ) -> CheckoutResult<ListResult<MovementWithProduct>> {
        Ok(self.db.stock().list_recent(page, per_page).await?)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn apply_if_exists(
        &self,
        product_id: &str,
        delta: i64,
        movement_type: MovementType,
        invoice_id: Option<&str>,
        note: Option<&str>,
    ) -> CheckoutResult<Option<StockMovement>> {
        let product = match self.db.products().get(product_id).await {
            Ok(product) => product,
            Err(e) if e.is_not_found() => {
                warn!(product = %product_id, "Invoice line refers to a missing product, stock not updated");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let (_, movement) = self
            .apply(product, delta, movement_type, invoice_id, note)
            .await?;
        Ok(Some(movement))
    }

    /// Writes the movement, then the new balance.
    async fn apply(
        &self,
        product: Product,
        delta: i64,
        movement_type: MovementType,
        invoice_id: Option<&str>,
        note: Option<&str>,
    ) -> CheckoutResult<(Product, StockMovement)> {
        let balance = product.current_stock + delta;
        let movement = self
            .db
            .stock()
            .record(&StockMovement {
                id: String::new(),
                product: product.id.clone(),
                movement_type,
                quantity: delta,
                balance_after: Some(balance),
                reference_type: invoice_id.map(|_| INVOICE_REFERENCE.to_string()),
                reference_id: invoice_id.map(str::to_string),
                notes: note.map(str::to_string),
            })
            .await?;
        let updated = self.db.products().set_stock(&product.id, balance).await?;

        if balance < 0 {
            warn!(
                product = %product.product_code,
                balance,
                "Stock went negative"
            );
        }
        Ok((updated, movement))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dukaan_core::{InvoiceStatus, Money, PaymentMethod, TaxRate, IMPORT_MARKER};

    fn product(code: &str, stock: i64) -> Product {
        Product {
            id: String::new(),
            product_code: code.to_string(),
            name: format!("Saree {}", code),
            description: None,
            hsn_code: None,
            purchase_price: None,
            retail_price: Money::from_rupees(1000),
            mrp: Money::from_rupees(1000),
            wholesale_price: None,
            cgst_pct: Some(TaxRate::DEFAULT_COMPONENT),
            sgst_pct: Some(TaxRate::DEFAULT_COMPONENT),
            unit: Some("PCS".to_string()),
            barcode: None,
            min_stock: 5,
            current_stock: stock,
            active: true,
        }
    }

    fn invoice(id: &str, notes: Option<&str>) -> Invoice {
        Invoice {
            id: id.to_string(),
            invoice_number: "GST-0001-2025/26".to_string(),
            invoice_date: Utc::now(),
            customer: "c1".to_string(),
            tax_type: "GST".to_string(),
            subtotal: Money::from_rupees(1000),
            discount_total: Money::zero(),
            cgst_total: Money::zero(),
            sgst_total: Money::zero(),
            grand_total: Money::from_rupees(1000),
            amount_paid: Money::from_rupees(1000),
            payment_method: PaymentMethod::Cash,
            status: InvoiceStatus::Completed,
            adjustment: Money::zero(),
            notes: notes.map(str::to_string),
            created_by: None,
        }
    }

    fn line(product: Option<&str>, quantity: i64) -> InvoiceLineItem {
        InvoiceLineItem {
            id: String::new(),
            invoice: "inv1".to_string(),
            product: product.map(str::to_string),
            product_name: "Saree".to_string(),
            product_code: String::new(),
            hsn_code: String::new(),
            barcode: String::new(),
            quantity,
            unit: "PCS".to_string(),
            unit_price: Money::from_rupees(1000),
            mrp: Money::zero(),
            taxable_amount: Money::zero(),
            cgst_pct: TaxRate::DEFAULT_COMPONENT,
            cgst_amount: Money::zero(),
            sgst_pct: TaxRate::DEFAULT_COMPONENT,
            sgst_amount: Money::zero(),
            total: Money::from_rupees(1000),
        }
    }

    #[tokio::test]
    async fn test_sale_decrements_and_records() {
        let db = Database::memory();
        let saved = db.products().create(&product("SAR-1", 1)).await.unwrap();
        let service = StockService::new(db.clone());

        let movement = service
            .record_sale(&invoice("inv1", None), &line(Some(&saved.id), 3))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(movement.movement_type, MovementType::Sale);
        assert_eq!(movement.quantity, -3);
        assert_eq!(movement.balance_after, Some(-2));
        assert_eq!(movement.reference_type.as_deref(), Some("invoice"));
        assert_eq!(movement.reference_id.as_deref(), Some("inv1"));

        // Negative stock is allowed
        assert_eq!(db.products().get(&saved.id).await.unwrap().current_stock, -2);
    }

    #[tokio::test]
    async fn test_sale_skips() {
        let db = Database::memory();
        let saved = db.products().create(&product("SAR-1", 4)).await.unwrap();
        let service = StockService::new(db.clone());

        let imported = invoice("inv1", Some(IMPORT_MARKER));
        assert!(service.record_sale(&imported, &line(Some(&saved.id), 1)).await.unwrap().is_none());
        let live = invoice("inv1", None);
        assert!(service.record_sale(&live, &line(None, 1)).await.unwrap().is_none());
        assert!(service.record_sale(&live, &line(Some(&saved.id), 0)).await.unwrap().is_none());
        assert!(service.record_sale(&live, &line(Some("gone"), 1)).await.unwrap().is_none());

        assert_eq!(db.products().get(&saved.id).await.unwrap().current_stock, 4);
        assert!(db.stock().list_for_reference("inv1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_return_lines() {
        let db = Database::memory();
        let saved = db.products().create(&product("SAR-1", 0)).await.unwrap();
        let service = StockService::new(db.clone());

        let written = service
            .return_lines(
                &invoice("old", None),
                &[line(Some(&saved.id), 2), line(None, 1)],
            )
            .await
            .unwrap();
        assert_eq!(written, 1);
        assert_eq!(db.products().get(&saved.id).await.unwrap().current_stock, 2);

        let movements = db.stock().list_for_reference("old").await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].movement_type, MovementType::Return);
        assert_eq!(movements[0].notes.as_deref(), Some("Revised GST-0001-2025/26"));
    }

    #[tokio::test]
    async fn test_manual_adjustment() {
        let db = Database::memory();
        let saved = db.products().create(&product("SAR-1", 3)).await.unwrap();
        let service = StockService::new(db.clone());

        let updated = service
            .adjust(&saved.id, MovementType::Purchase, 12, Some(" Surat lot "))
            .await
            .unwrap();
        assert_eq!(updated.current_stock, 15);

        let updated = service
            .adjust(&saved.id, MovementType::Adjustment, -1, None)
            .await
            .unwrap();
        assert_eq!(updated.current_stock, 14);

        let history = service.history(&saved.id, 1, 10).await.unwrap();
        assert_eq!(history.total_items, 2);
        let notes: Vec<Option<String>> = history.items.iter().map(|m| m.notes.clone()).collect();
        assert!(notes.contains(&Some("Surat lot".to_string())));

        assert!(service.adjust(&saved.id, MovementType::Purchase, 0, None).await.is_err());
        assert!(service.adjust(&saved.id, MovementType::Sale, 1, None).await.is_err());
    }

    #[tokio::test]
    async fn test_stock_listings() {
        let db = Database::memory();
        db.products().create(&product("LOW", 2)).await.unwrap();
        db.products().create(&product("NEG", -1)).await.unwrap();
        db.products().create(&product("OK", 20)).await.unwrap();
        let service = StockService::new(db);

        let low = service.low_stock(1, 10).await.unwrap();
        assert_eq!(low.items.len(), 1);
        assert_eq!(low.items[0].product_code, "LOW");

        let negative = service.negative_stock(1, 10).await.unwrap();
        assert_eq!(negative.items.len(), 1);
        assert_eq!(negative.items[0].product_code, "NEG");
    }
}
