//! # Post-Finalize Adjustment
//!
//! A completed invoice can be taken down further after it was saved,
//! with the same stepper the cart uses. The stepper base is
//! `subtotal - discount_total`, so the original discount is never
//! touched.
//!
//! ```text
//! subtotal 3000, discount 25      base 2975
//!   Up   → adjustment 25          grand total 2950
//!   Up   → adjustment 50          grand total 2925
//!   Down → adjustment 25          grand total 2950
//! ```
//!
//! Tax totals and `amount_paid` are rewritten from the new grand total.
//! Line items keep their original amounts.

use tracing::info;

use dukaan_core::{adjust, AdjustmentStep, Invoice};
use dukaan_store::Database;

use crate::config::CheckoutConfig;
use crate::error::CheckoutResult;
use crate::state::SettingsCache;

#[derive(Debug, Clone)]
pub struct AdjustmentService {
    db: Database,
    settings: SettingsCache,
    config: CheckoutConfig,
}

impl AdjustmentService {
    pub fn new(db: Database, settings: SettingsCache, config: CheckoutConfig) -> Self {
        AdjustmentService {
            db,
            settings,
            config,
        }
    }

    /// Applies one adjustment step and returns the updated header.
    pub async fn adjust(&self, invoice_id: &str, step: AdjustmentStep) -> CheckoutResult<Invoice> {
        let invoices = self.db.invoices();
        let invoice = invoices.get(invoice_id).await?;
        let settings = self.settings.get(self.config.today()).await?;

        let totals = adjust(&invoice, step, settings.default_cgst, settings.default_sgst)?;
        if totals.adjustment == invoice.adjustment {
            return Ok(invoice);
        }

        let updated = invoices.apply_adjustment(&invoice.id, &totals).await?;
        info!(
            number = %updated.invoice_number,
            id = %updated.id,
            adjustment = %totals.adjustment,
            grand_total = %totals.grand_total,
            "Invoice adjusted"
        );
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CheckoutError;
    use crate::services::CheckoutService;
    use crate::state::CartState;
    use dukaan_core::{CoreError, InvoiceStatus, Money, Product};

    async fn completed_invoice(db: &Database) -> (AdjustmentService, CheckoutService, Invoice) {
        db.settings().seed_defaults().await.unwrap();
        let config = CheckoutConfig::default();
        let settings = SettingsCache::new(db.clone());
        let checkout = CheckoutService::new(db.clone(), settings.clone(), config.clone());
        let product = db
            .products()
            .create(&Product {
                id: String::new(),
                product_code: "SAR-9".to_string(),
                name: "Chanderi Saree".to_string(),
                description: None,
                hsn_code: None,
                purchase_price: None,
                retail_price: Money::from_rupees(1500),
                mrp: Money::from_rupees(1500),
                wholesale_price: None,
                cgst_pct: None,
                sgst_pct: None,
                unit: None,
                barcode: None,
                min_stock: 0,
                current_stock: 10,
                active: true,
            })
            .await
            .unwrap();

        let cart = CartState::new();
        cart.update(|c| {
            c.add_item(&product);
            c.add_item(&product);
            c.discount_up()
        })
        .unwrap();
        let invoice = checkout.finalize(&cart).await.unwrap().invoice;
        (
            AdjustmentService::new(db.clone(), settings, config),
            checkout,
            invoice,
        )
    }

    #[tokio::test]
    async fn test_step_up_and_down() {
        let db = Database::memory();
        let (service, _, invoice) = completed_invoice(&db).await;
        assert_eq!(invoice.grand_total, Money::from_rupees(2975));

        let up = service.adjust(&invoice.id, AdjustmentStep::Up).await.unwrap();
        assert_eq!(up.adjustment, Money::from_rupees(25));
        assert_eq!(up.grand_total, Money::from_rupees(2950));
        assert_eq!(up.amount_paid, Money::from_rupees(2950));
        assert_eq!(up.discount_total, Money::from_rupees(25));
        // 2950 / 1.05 = 2809.52, 2.5% of that = 70.24
        assert_eq!(up.cgst_total, Money::from_paise(7024));

        let up = service.adjust(&invoice.id, AdjustmentStep::Up).await.unwrap();
        assert_eq!(up.adjustment, Money::from_rupees(50));
        assert_eq!(up.grand_total, Money::from_rupees(2925));

        let down = service.adjust(&invoice.id, AdjustmentStep::Down).await.unwrap();
        assert_eq!(down.adjustment, Money::from_rupees(25));
        assert_eq!(db.invoices().get(&invoice.id).await.unwrap(), down);
    }

    #[tokio::test]
    async fn test_set_is_clamped() {
        let db = Database::memory();
        let (service, _, invoice) = completed_invoice(&db).await;

        let all = service
            .adjust(&invoice.id, AdjustmentStep::Set(Money::from_rupees(5000)))
            .await
            .unwrap();
        assert_eq!(all.adjustment, Money::from_rupees(2975));
        assert_eq!(all.grand_total, Money::zero());
        assert_eq!(all.cgst_total, Money::zero());

        let none = service
            .adjust(&invoice.id, AdjustmentStep::Set(Money::from_rupees(-10)))
            .await
            .unwrap();
        assert_eq!(none.adjustment, Money::zero());
        assert_eq!(none.grand_total, Money::from_rupees(2975));
    }

    #[tokio::test]
    async fn test_revised_invoice_cannot_be_adjusted() {
        let db = Database::memory();
        let (service, checkout, invoice) = completed_invoice(&db).await;
        let cart = CartState::new();
        checkout.load_for_edit(&invoice.id, &cart).await.unwrap();
        checkout.finalize(&cart).await.unwrap();

        let err = service
            .adjust(&invoice.id, AdjustmentStep::Up)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Core(CoreError::InvalidInvoiceStatus { .. })
        ));
        let stored = db.invoices().get(&invoice.id).await.unwrap();
        assert_eq!(stored.status, InvoiceStatus::Revised);
        assert_eq!(stored.adjustment, Money::zero());
    }
}
