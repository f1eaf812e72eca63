//! # Checkout Service
//!
//! Turns the session cart into a persisted invoice, either a new one or
//! a revision of an invoice loaded for editing.
//!
//! ## Finalize Protocol
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         finalize(cart)                                  │
//! │                                                                         │
//! │  1. Cart checks ─────────► empty / unpriced lines ─► blocking error     │
//! │                                                                         │
//! │  2. Resolve customer ────► mobile lookup / create / walk-in             │
//! │                                                                         │
//! │  3. Number                                                              │
//! │     new:    atomic    ─► reserve counter, number = counter              │
//! │             two_phase ─► read counter, number = counter + 1             │
//! │     revise: old row must be the live one ─► mark it `revised`,          │
//! │             reuse its number, return its lines to stock                 │
//! │                                                                         │
//! │  4. Create header (status completed)                                    │
//! │     two_phase ─► write counter after the header exists                  │
//! │                                                                         │
//! │  5. Create each line, then take it out of stock                         │
//! │     a line failing here ─► PartialFinalize (header stays, no rollback)  │
//! │                                                                         │
//! │  6. Clear cart (customer kept when configured)                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any store failure before the header exists surfaces as
//! [`CheckoutError::SaveFailed`] and leaves the cart untouched for retry.
//!
//! ## Known Gaps
//! - `two_phase` numbering lets two terminals issue the same number.
//! - A revision whose new header fails to save leaves the number with
//!   no live row; the old row must be restored by hand.
//! - Finalize is not idempotent. Retrying after `PartialFinalize` creates
//!   a second header.

use chrono::Utc;
use tracing::{error, info, warn};

use dukaan_core::invoice::{ensure_revisable, live_revision};
use dukaan_core::{
    Cart, Customer, DraftContext, EditingInvoice, Invoice, InvoiceDraft, InvoiceLineItem,
    InvoiceNumber, Product,
};
use dukaan_store::{Database, InvoiceWithCustomer, ListResult, ShopSettings};

use crate::config::{AllocationMode, CheckoutConfig};
use crate::error::{CheckoutError, CheckoutResult};
use crate::services::customer::CustomerService;
use crate::services::stock::StockService;
use crate::state::{CartState, SettingsCache};

/// Result of a successful finalize.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizeOutcome {
    pub invoice: Invoice,
    pub lines: Vec<InvoiceLineItem>,
    pub customer: Customer,
    /// The row this invoice replaced, now `revised`.
    pub superseded: Option<Invoice>,
    /// Stock movements written for the sale and any returned lines.
    pub stock_movements: usize,
}

/// An invoice with everything the invoice screen shows.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceDetail {
    pub invoice: Invoice,
    pub customer: Option<Customer>,
    pub lines: Vec<InvoiceLineItem>,
    /// Every row sharing the invoice number, oldest first.
    pub revisions: Vec<Invoice>,
}

/// A reserved or candidate number, plus the counter to persist once the
/// header exists (two-phase only).
struct Allocation {
    number: InvoiceNumber,
    advance_after_create: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct CheckoutService {
    db: Database,
    settings: SettingsCache,
    config: CheckoutConfig,
    customers: CustomerService,
    stock: StockService,
}

impl CheckoutService {
    pub fn new(db: Database, settings: SettingsCache, config: CheckoutConfig) -> Self {
        CheckoutService {
            customers: CustomerService::new(db.clone()),
            stock: StockService::new(db.clone()),
            db,
            settings,
            config,
        }
    }

    // =========================================================================
    // Finalize
    // =========================================================================

    /// Saves the cart as an invoice and clears it.
    pub async fn finalize(&self, cart: &CartState) -> CheckoutResult<FinalizeOutcome> {
        let snapshot = cart.snapshot();
        snapshot.validate_for_finalize()?;

        let settings = self
            .settings
            .get(self.config.today())
            .await
            .map_err(during_save)?;
        let customer = self
            .customers
            .resolve(&snapshot, &settings.default_state)
            .await
            .map_err(during_save)?;

        let (allocation, superseded) = match snapshot.editing() {
            Some(editing) => {
                let (old, old_lines) = self.supersede(editing).await?;
                let number = Allocation {
                    number: old.invoice_number.parse()?,
                    advance_after_create: None,
                };
                (number, Some((old, old_lines)))
            }
            None => (self.allocate(&settings).await?, None),
        };

        let ctx = DraftContext {
            invoice_number: allocation.number.to_string(),
            customer_id: customer.id.clone(),
            invoice_date: Utc::now(),
            header_cgst: settings.default_cgst,
            header_sgst: settings.default_sgst,
            created_by: self.config.terminal.user_id.clone(),
            notes: None,
        };
        let mut draft = InvoiceDraft::from_cart(&snapshot, ctx)?;

        let header = match self.db.invoices().create(&draft.header).await {
            Ok(header) => header,
            Err(source) => {
                if let Some((old, _)) = &superseded {
                    error!(
                        number = %old.invoice_number,
                        old_id = %old.id,
                        "Revision header failed after the old row was marked revised"
                    );
                }
                return Err(CheckoutError::save_failed(source));
            }
        };

        if let Some(counter) = allocation.advance_after_create {
            if let Err(e) = self.db.settings().advance_invoice_counter(counter).await {
                warn!(
                    number = %header.invoice_number,
                    error = %e,
                    "Invoice saved but counter not advanced; the next number may repeat"
                );
            }
        }
        self.settings.invalidate().await;

        let mut stock_movements = 0;
        if let Some((old, old_lines)) = &superseded {
            if self.config.stock.decrement_on_sale {
                stock_movements += self.best_effort_return(old, old_lines).await;
            }
        }

        draft.attach_lines(&header.id);
        let expected = draft.lines.len();
        let mut lines = Vec::with_capacity(expected);
        for line in &draft.lines {
            let item = match self.db.invoices().create_item(line).await {
                Ok(item) => item,
                Err(source) => {
                    warn!(
                        invoice = %header.id,
                        number = %header.invoice_number,
                        saved = lines.len(),
                        expected,
                        "Invoice header orphaned with missing items"
                    );
                    return Err(CheckoutError::PartialFinalize {
                        invoice_id: header.id.clone(),
                        invoice_number: header.invoice_number.clone(),
                        saved: lines.len(),
                        expected,
                        source,
                    });
                }
            };
            if self.config.stock.decrement_on_sale {
                match self.stock.record_sale(&header, &item).await {
                    Ok(Some(_)) => stock_movements += 1,
                    Ok(None) => {}
                    Err(e) => warn!(
                        invoice = %header.id,
                        item = %item.id,
                        error = %e,
                        "Stock not updated for invoice line"
                    ),
                }
            }
            lines.push(item);
        }

        let keep_customer = self.config.invoice.keep_customer_after_finalize;
        let cleared = cart.update(|cart| {
            cart.clear(keep_customer);
            if keep_customer {
                cart.customer = Some(customer.clone());
            }
        });
        if let Err(e) = cleared {
            warn!(error = %e, "Invoice saved but cart snapshot not written");
        }

        info!(
            number = %header.invoice_number,
            id = %header.id,
            grand_total = %header.grand_total,
            lines = lines.len(),
            revision = superseded.is_some(),
            "Invoice finalized"
        );

        Ok(FinalizeOutcome {
            invoice: header,
            lines,
            customer,
            superseded: superseded.map(|(old, _)| old),
            stock_movements,
        })
    }

    /// Number the next new invoice would get, for display. Nothing is
    /// reserved.
    pub async fn next_invoice_number(&self) -> CheckoutResult<String> {
        let settings = self.settings.get(self.config.today()).await?;
        let mut sequence = settings.sequence.clone();
        sequence.counter = self.db.settings().invoice_counter().await?;
        Ok(sequence.candidate().to_string())
    }

    async fn allocate(&self, settings: &ShopSettings) -> CheckoutResult<Allocation> {
        let repo = self.db.settings();
        let allocation = match self.config.invoice.allocation {
            AllocationMode::Atomic => {
                let counter = repo.reserve_invoice_counter().await.map_err(CheckoutError::save_failed)?;
                Allocation {
                    number: settings.sequence.number_for(counter),
                    advance_after_create: None,
                }
            }
            AllocationMode::TwoPhase => {
                // Read fresh: the cached counter is stale after any sale
                let mut sequence = settings.sequence.clone();
                sequence.counter = repo.invoice_counter().await.map_err(CheckoutError::save_failed)?;
                let number = sequence.candidate();
                Allocation {
                    advance_after_create: Some(number.counter),
                    number,
                }
            }
        };
        Ok(allocation)
    }

    /// Marks the edited row revised. Returns it with its lines.
    async fn supersede(
        &self,
        editing: &EditingInvoice,
    ) -> CheckoutResult<(Invoice, Vec<InvoiceLineItem>)> {
        let invoices = self.db.invoices();
        let old = invoices.get(&editing.id).await.map_err(CheckoutError::save_failed)?;
        ensure_revisable(&old)?;

        let rows = invoices
            .find_by_number(&old.invoice_number)
            .await
            .map_err(CheckoutError::save_failed)?;
        live_revision(&old.invoice_number, &rows)?;

        let old_lines = invoices
            .list_items(&old.id)
            .await
            .map_err(CheckoutError::save_failed)?;
        let revised = invoices
            .mark_revised(&old.id)
            .await
            .map_err(CheckoutError::save_failed)?;
        Ok((revised, old_lines))
    }

    async fn best_effort_return(&self, old: &Invoice, lines: &[InvoiceLineItem]) -> usize {
        match self.stock.return_lines(old, lines).await {
            Ok(written) => written,
            Err(e) => {
                warn!(invoice = %old.id, error = %e, "Superseded lines not returned to stock");
                0
            }
        }
    }

    // =========================================================================
    // Editing
    // =========================================================================

    /// Loads a saved invoice into the cart for revision.
    pub async fn load_for_edit(&self, invoice_id: &str, cart: &CartState) -> CheckoutResult<()> {
        let InvoiceWithCustomer { invoice, customer } =
            self.db.invoices().get_with_customer(invoice_id).await?;
        ensure_revisable(&invoice)?;

        let lines = self.db.invoices().list_items(&invoice.id).await?;
        let products = self.live_products(&lines).await?;

        cart.update(|cart| cart.load_for_edit(&invoice, customer, &lines, &products))??;
        info!(number = %invoice.invoice_number, id = %invoice.id, "Invoice loaded for editing");
        Ok(())
    }

    /// Leaves edit mode without saving.
    pub fn cancel_edit(&self, cart: &CartState) -> CheckoutResult<()> {
        cart.clear(false)
    }

    /// Catalog products still present for the given lines.
    async fn live_products(&self, lines: &[InvoiceLineItem]) -> CheckoutResult<Vec<Product>> {
        let mut products: Vec<Product> = Vec::new();
        for id in lines.iter().filter_map(|l| l.product.as_deref()) {
            if products.iter().any(|p| p.id == id) {
                continue;
            }
            match self.db.products().get(id).await {
                Ok(product) => products.push(product),
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(products)
    }

    // =========================================================================
    // Viewing
    // =========================================================================

    pub async fn invoice_detail(&self, invoice_id: &str) -> CheckoutResult<InvoiceDetail> {
        let invoices = self.db.invoices();
        let InvoiceWithCustomer { invoice, customer } = invoices.get_with_customer(invoice_id).await?;
        let lines = invoices.list_items(&invoice.id).await?;
        let revisions = invoices.find_by_number(&invoice.invoice_number).await?;
        Ok(InvoiceDetail {
            invoice,
            customer,
            lines,
            revisions,
        })
    }

    /// Invoice list, newest first. Revised rows are hidden unless asked for.
    pub async fn list_invoices(
        &self,
        query: &str,
        include_revised: bool,
        page: u32,
        per_page: u32,
    ) -> CheckoutResult<ListResult<InvoiceWithCustomer>> {
        Ok(self
            .db
            .invoices()
            .list(query, include_revised, page, per_page)
            .await?)
    }

    /// Totals of a cart, recomputed for the review screen.
    pub fn preview(&self, cart: &Cart) -> dukaan_core::CartTotals {
        dukaan_core::CartTotals::from(cart)
    }
}

/// Maps a store failure met while finalizing to the generic save notice.
fn during_save(err: CheckoutError) -> CheckoutError {
    match err {
        CheckoutError::Store(source) => CheckoutError::save_failed(source),
        other => other,
    }
}
