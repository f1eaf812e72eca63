//! # Invoice Repository
//!
//! Invoice headers and their line items.
//!
//! ## Revisions
//! ```text
//! invoice_number GST-0007-2025/26
//!   ├── row A  status=revised    (superseded, kept for audit)
//!   └── row B  status=completed  (live)
//! ```
//! Rows are never deleted. Only `status` and the adjustment totals change
//! after creation.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::{debug, info};

use dukaan_core::{AdjustedTotals, Customer, Invoice, InvoiceLineItem, InvoiceStatus};

use crate::error::StoreResult;
use crate::record::{encode, Collection, Filter, ListQuery, ListResult};
use crate::store::SharedStore;

/// An invoice header with its customer, when the customer still exists.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceWithCustomer {
    pub invoice: Invoice,
    pub customer: Option<Customer>,
}

#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    store: SharedStore,
}

impl InvoiceRepository {
    pub fn new(store: SharedStore) -> Self {
        InvoiceRepository { store }
    }

    // =========================================================================
    // Headers
    // =========================================================================

    pub async fn get(&self, id: &str) -> StoreResult<Invoice> {
        self.store.get(Collection::Invoices, id).await?.decode()
    }

    /// Gets an invoice with its customer expanded.
    pub async fn get_with_customer(&self, id: &str) -> StoreResult<InvoiceWithCustomer> {
        let record = self.store.get(Collection::Invoices, id).await?;
        let record = self
            .store
            .expand(record, &["customer".to_string()])
            .await?;
        Ok(InvoiceWithCustomer {
            customer: record.decode_expand("customer")?,
            invoice: record.decode()?,
        })
    }

    pub async fn create(&self, invoice: &Invoice) -> StoreResult<Invoice> {
        debug!(number = %invoice.invoice_number, "Creating invoice header");
        self.store
            .create(Collection::Invoices, encode(invoice)?)
            .await?
            .decode()
    }

    /// Every row sharing `invoice_number`, oldest first.
    pub async fn find_by_number(&self, invoice_number: &str) -> StoreResult<Vec<Invoice>> {
        self.store
            .list_all(
                Collection::Invoices,
                Filter::eq("invoice_number", invoice_number),
                "created",
            )
            .await?
            .iter()
            .map(|r| r.decode())
            .collect()
    }

    /// Marks a row as superseded by a newer revision.
    pub async fn mark_revised(&self, id: &str) -> StoreResult<Invoice> {
        let mut patch = Map::new();
        patch.insert(
            "status".to_string(),
            Value::String(InvoiceStatus::Revised.as_str().to_string()),
        );
        let invoice: Invoice = self
            .store
            .update(Collection::Invoices, id, patch)
            .await?
            .decode()?;
        info!(id = %id, number = %invoice.invoice_number, "Invoice marked revised");
        Ok(invoice)
    }

    /// Writes adjusted totals onto a header.
    pub async fn apply_adjustment(&self, id: &str, totals: &AdjustedTotals) -> StoreResult<Invoice> {
        self.store
            .update(Collection::Invoices, id, encode(totals)?)
            .await?
            .decode()
    }

    /// Completed invoices dated within `[from, to)`, oldest first.
    pub async fn list_completed_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<Invoice>> {
        let filter = Filter::eq("status", InvoiceStatus::Completed.as_str())
            .and(Filter::gte("invoice_date", from.to_rfc3339()))
            .and(Filter::lt("invoice_date", to.to_rfc3339()));
        self.store
            .list_all(Collection::Invoices, filter, "invoice_date")
            .await?
            .iter()
            .map(|r| r.decode())
            .collect()
    }

    /// Invoice list, newest first, with customers expanded. Revised rows
    /// are hidden unless asked for. `query` matches the invoice number.
    pub async fn list(
        &self,
        query: &str,
        include_revised: bool,
        page: u32,
        per_page: u32,
    ) -> StoreResult<ListResult<InvoiceWithCustomer>> {
        let mut filter = if include_revised {
            Filter::All
        } else {
            Filter::ne("status", InvoiceStatus::Revised.as_str())
        };
        let query = query.trim();
        if !query.is_empty() {
            filter = filter.and(Filter::contains("invoice_number", query));
        }
        let list = ListQuery::new(filter)
            .sort("-invoice_date,-created")
            .page(page, per_page)
            .expand(&["customer"]);
        self.store
            .list(Collection::Invoices, &list)
            .await?
            .try_map(|r| {
                Ok(InvoiceWithCustomer {
                    customer: r.decode_expand("customer")?,
                    invoice: r.decode()?,
                })
            })
    }

    // =========================================================================
    // Line Items
    // =========================================================================

    pub async fn create_item(&self, item: &InvoiceLineItem) -> StoreResult<InvoiceLineItem> {
        let mut payload = encode(item)?;
        // Ad-hoc lines carry an empty product relation
        if item.product.is_none() {
            payload.insert("product".to_string(), Value::String(String::new()));
        }
        self.store
            .create(Collection::InvoiceItems, payload)
            .await?
            .decode()
    }

    /// Line items of one invoice, in creation order.
    pub async fn list_items(&self, invoice_id: &str) -> StoreResult<Vec<InvoiceLineItem>> {
        self.store
            .list_all(
                Collection::InvoiceItems,
                Filter::eq("invoice", invoice_id),
                "created",
            )
            .await?
            .iter()
            .map(|r| r.decode())
            .collect()
    }

    /// Line items of several invoices at once.
    pub async fn list_items_for(&self, invoice_ids: &[String]) -> StoreResult<Vec<InvoiceLineItem>> {
        if invoice_ids.is_empty() {
            return Ok(Vec::new());
        }
        let filter = Filter::any_of(
            invoice_ids
                .iter()
                .map(|id| Filter::eq("invoice", id.as_str()))
                .collect(),
        );
        self.store
            .list_all(Collection::InvoiceItems, filter, "created")
            .await?
            .iter()
            .map(|r| r.decode())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::repository::customer::CustomerRepository;
    use chrono::TimeZone;
    use dukaan_core::{Money, PaymentMethod, TaxRate};
    use std::sync::Arc;

    fn header(number: &str, customer: &str, day: u32) -> Invoice {
        Invoice {
            id: String::new(),
            invoice_number: number.to_string(),
            invoice_date: Utc.with_ymd_and_hms(2025, 6, day, 10, 0, 0).unwrap(),
            customer: customer.to_string(),
            tax_type: "GST".to_string(),
            subtotal: Money::from_rupees(1000),
            discount_total: Money::zero(),
            cgst_total: Money::from_paise(2381),
            sgst_total: Money::from_paise(2381),
            grand_total: Money::from_rupees(1000),
            amount_paid: Money::from_rupees(1000),
            payment_method: PaymentMethod::Upi,
            status: InvoiceStatus::Completed,
            adjustment: Money::zero(),
            notes: None,
            created_by: None,
        }
    }

    fn line(invoice: &str, product: Option<&str>) -> InvoiceLineItem {
        InvoiceLineItem {
            id: String::new(),
            invoice: invoice.to_string(),
            product: product.map(str::to_string),
            product_name: "Saree - 1".to_string(),
            product_code: String::new(),
            hsn_code: String::new(),
            barcode: String::new(),
            quantity: 1,
            unit: "PCS".to_string(),
            unit_price: Money::from_rupees(1000),
            mrp: Money::zero(),
            taxable_amount: Money::from_paise(95238),
            cgst_pct: TaxRate::DEFAULT_COMPONENT,
            cgst_amount: Money::from_paise(2381),
            sgst_pct: TaxRate::DEFAULT_COMPONENT,
            sgst_amount: Money::from_paise(2381),
            total: Money::from_rupees(1000),
        }
    }

    #[tokio::test]
    async fn test_header_round_trip_with_customer() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let customers = CustomerRepository::new(store.clone());
        let customer = customers
            .create(&Customer {
                id: String::new(),
                name: "Asha".to_string(),
                mobile: "9876543210".to_string(),
                email: None,
                address: None,
                city: None,
                state: None,
                gstin: None,
                notes: None,
            })
            .await
            .unwrap();

        let repo = InvoiceRepository::new(store);
        let created = repo
            .create(&header("GST-0001-2025/26", &customer.id, 1))
            .await
            .unwrap();
        assert_eq!(created.payment_method, PaymentMethod::Upi);
        assert_eq!(created.cgst_total, Money::from_paise(2381));

        let loaded = repo.get_with_customer(&created.id).await.unwrap();
        assert_eq!(loaded.invoice, created);
        assert_eq!(loaded.customer.map(|c| c.name), Some("Asha".to_string()));
    }

    #[tokio::test]
    async fn test_revision_rows_share_number() {
        let repo = InvoiceRepository::new(Arc::new(MemoryStore::new()));
        let first = repo.create(&header("GST-0007-2025/26", "c1", 1)).await.unwrap();
        repo.mark_revised(&first.id).await.unwrap();
        repo.create(&header("GST-0007-2025/26", "c1", 1)).await.unwrap();

        let rows = repo.find_by_number("GST-0007-2025/26").await.unwrap();
        let statuses: Vec<InvoiceStatus> = rows.iter().map(|r| r.status).collect();
        assert_eq!(statuses, vec![InvoiceStatus::Revised, InvoiceStatus::Completed]);

        let visible = repo.list("", false, 1, 10).await.unwrap();
        assert_eq!(visible.total_items, 1);
        let all = repo.list("0007", true, 1, 10).await.unwrap();
        assert_eq!(all.total_items, 2);
    }

    #[tokio::test]
    async fn test_date_range_and_items() {
        let repo = InvoiceRepository::new(Arc::new(MemoryStore::new()));
        let a = repo.create(&header("GST-0001-2025/26", "c1", 1)).await.unwrap();
        let b = repo.create(&header("GST-0002-2025/26", "c1", 2)).await.unwrap();
        repo.create(&header("GST-0003-2025/26", "c1", 3)).await.unwrap();

        let from = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2025, 6, 3, 0, 0, 0).unwrap();
        let in_range = repo.list_completed_between(from, to).await.unwrap();
        assert_eq!(in_range.len(), 2);

        let quick = repo.create_item(&line(&a.id, None)).await.unwrap();
        assert_eq!(quick.product, None);
        repo.create_item(&line(&b.id, Some("p1"))).await.unwrap();

        assert_eq!(repo.list_items(&a.id).await.unwrap().len(), 1);
        let both = repo
            .list_items_for(&[a.id.clone(), b.id.clone()])
            .await
            .unwrap();
        assert_eq!(both.len(), 2);
        assert!(repo.list_items_for(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_apply_adjustment() {
        let repo = InvoiceRepository::new(Arc::new(MemoryStore::new()));
        let invoice = repo.create(&header("GST-0001-2025/26", "c1", 1)).await.unwrap();
        let totals = AdjustedTotals {
            adjustment: Money::from_rupees(50),
            grand_total: Money::from_rupees(950),
            cgst_total: Money::from_paise(2262),
            sgst_total: Money::from_paise(2262),
            amount_paid: Money::from_rupees(950),
        };
        let updated = repo.apply_adjustment(&invoice.id, &totals).await.unwrap();
        assert_eq!(updated.grand_total, Money::from_rupees(950));
        assert_eq!(updated.adjustment, Money::from_rupees(50));
        assert_eq!(updated.subtotal, Money::from_rupees(1000));
    }
}
