//! # Reports
//!
//! Read-only views over completed invoices. Revised rows never count:
//! a sale that was edited appears once, with its latest totals.
//!
//! ## Day Boundaries
//! ```text
//! Shop day 2025-08-15 at UTC+05:30
//!
//!   local  2025-08-15 00:00 ─────────────► 2025-08-16 00:00
//!   UTC    2025-08-14 18:30 ─────────────► 2025-08-15 18:30
//! ```
//! Invoice dates are stored in UTC; ranges are built from the terminal's
//! configured offset so a late-evening sale lands on the right day.

use chrono::{DateTime, Days, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use std::collections::BTreeMap;
use std::ops::AddAssign;

use dukaan_core::{Invoice, Money};
use dukaan_store::Database;

use crate::config::CheckoutConfig;
use crate::error::CheckoutResult;

// =============================================================================
// Report Types
// =============================================================================

/// Half-open UTC range `[from, to)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DateRange {
    /// Local days `first..=last` at `offset`.
    pub fn days(first: NaiveDate, last: NaiveDate, offset: FixedOffset) -> Self {
        let after_last = last.checked_add_days(Days::new(1)).unwrap_or(last);
        DateRange {
            from: day_start(first, offset),
            to: day_start(after_last, offset),
        }
    }

    /// One local day.
    pub fn day(date: NaiveDate, offset: FixedOffset) -> Self {
        DateRange::days(date, date, offset)
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from <= at && at < self.to
    }
}

fn day_start(date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    let local_midnight = date.and_time(NaiveTime::MIN);
    let utc = local_midnight - Duration::seconds(offset.local_minus_utc() as i64);
    Utc.from_utc_datetime(&utc)
}

/// Header totals summed over a set of invoices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SalesSummary {
    pub invoice_count: usize,
    pub subtotal: Money,
    pub discount: Money,
    pub cgst: Money,
    pub sgst: Money,
    pub grand_total: Money,
}

impl AddAssign<&Invoice> for SalesSummary {
    fn add_assign(&mut self, invoice: &Invoice) {
        self.invoice_count += 1;
        self.subtotal += invoice.subtotal;
        self.discount += invoice.discount_total + invoice.adjustment;
        self.cgst += invoice.cgst_total;
        self.sgst += invoice.sgst_total;
        self.grand_total += invoice.grand_total;
    }
}

impl<'a> FromIterator<&'a Invoice> for SalesSummary {
    fn from_iter<I: IntoIterator<Item = &'a Invoice>>(iter: I) -> Self {
        let mut summary = SalesSummary::default();
        for invoice in iter {
            summary += invoice;
        }
        summary
    }
}

/// One row of the daily sales report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailySales {
    pub date: NaiveDate,
    pub summary: SalesSummary,
}

/// One row of the product-wise sales report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSales {
    /// Catalog product id; `None` for ad-hoc lines, grouped by name.
    pub product: Option<String>,
    pub name: String,
    pub quantity: i64,
    pub total: Money,
}

/// Figures for the home screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DashboardStats {
    pub today_invoices: usize,
    pub today_sales: Money,
    pub low_stock: u64,
    pub negative_stock: u64,
}

// =============================================================================
// Service
// =============================================================================

#[derive(Debug, Clone)]
pub struct ReportService {
    db: Database,
    config: CheckoutConfig,
}

impl ReportService {
    pub fn new(db: Database, config: CheckoutConfig) -> Self {
        ReportService { db, config }
    }

    /// Local days `first..=last` at the terminal's offset.
    pub fn range(&self, first: NaiveDate, last: NaiveDate) -> DateRange {
        DateRange::days(first, last, self.config.utc_offset())
    }

    /// Completed invoices in the range, oldest first. Doubles as the GST
    /// register: each header carries its taxable split.
    pub async fn gst_register(&self, range: DateRange) -> CheckoutResult<Vec<Invoice>> {
        Ok(self
            .db
            .invoices()
            .list_completed_between(range.from, range.to)
            .await?)
    }

    /// Totals over the whole range.
    pub async fn sales_summary(&self, range: DateRange) -> CheckoutResult<SalesSummary> {
        let invoices = self.gst_register(range).await?;
        Ok(invoices.iter().collect())
    }

    /// Totals per local day. Days without sales are left out.
    pub async fn daily_summary(&self, range: DateRange) -> CheckoutResult<Vec<DailySales>> {
        let offset = self.config.utc_offset();
        let mut days: BTreeMap<NaiveDate, SalesSummary> = BTreeMap::new();
        for invoice in &self.gst_register(range).await? {
            let date = invoice.invoice_date.with_timezone(&offset).date_naive();
            *days.entry(date).or_default() += invoice;
        }
        Ok(days
            .into_iter()
            .map(|(date, summary)| DailySales { date, summary })
            .collect())
    }

    /// Units and line totals per product, best sellers first.
    pub async fn product_sales(&self, range: DateRange) -> CheckoutResult<Vec<ProductSales>> {
        let ids: Vec<String> = self
            .gst_register(range)
            .await?
            .into_iter()
            .map(|i| i.id)
            .collect();
        let lines = self.db.invoices().list_items_for(&ids).await?;

        let mut rows: Vec<ProductSales> = Vec::new();
        for line in &lines {
            let existing = rows.iter_mut().find(|row| match (&row.product, &line.product) {
                (Some(a), Some(b)) => a == b,
                (None, None) => row.name == line.product_name,
                _ => false,
            });
            match existing {
                Some(row) => {
                    row.quantity += line.quantity;
                    row.total += line.total;
                }
                None => rows.push(ProductSales {
                    product: line.product.clone(),
                    name: line.product_name.clone(),
                    quantity: line.quantity,
                    total: line.total,
                }),
            }
        }
        rows.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name)));
        Ok(rows)
    }

    pub async fn dashboard(&self) -> CheckoutResult<DashboardStats> {
        let today = self.sales_summary(DateRange::day(self.config.today(), self.config.utc_offset()))
            .await?;
        let products = self.db.products();
        Ok(DashboardStats {
            today_invoices: today.invoice_count,
            today_sales: today.grand_total,
            low_stock: products.low_stock(1, 1).await?.total_items,
            negative_stock: products.negative_stock(1, 1).await?.total_items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dukaan_core::{InvoiceLineItem, InvoiceStatus, PaymentMethod, Product, TaxRate};

    fn ist() -> FixedOffset {
        FixedOffset::east_opt(330 * 60).unwrap()
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, d).unwrap()
    }

    fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, d, h, m, 0).unwrap()
    }

    async fn invoice(db: &Database, at: DateTime<Utc>, rupees: i64, status: InvoiceStatus) -> Invoice {
        let total = Money::from_rupees(rupees);
        db.invoices()
            .create(&Invoice {
                id: String::new(),
                invoice_number: format!("GST-{}-2025/26", rupees),
                invoice_date: at,
                customer: "c_walk_in".to_string(),
                tax_type: "GST".to_string(),
                subtotal: total,
                discount_total: Money::zero(),
                cgst_total: Money::from_paise(total.paise() / 42),
                sgst_total: Money::from_paise(total.paise() / 42),
                grand_total: total,
                amount_paid: total,
                payment_method: PaymentMethod::Cash,
                status,
                adjustment: Money::zero(),
                notes: None,
                created_by: None,
            })
            .await
            .unwrap()
    }

    async fn line(db: &Database, invoice: &Invoice, product: Option<&str>, name: &str, qty: i64, rupees: i64) {
        let total = Money::from_rupees(rupees);
        db.invoices()
            .create_item(&InvoiceLineItem {
                id: String::new(),
                invoice: invoice.id.clone(),
                product: product.map(str::to_string),
                product_name: name.to_string(),
                product_code: String::new(),
                hsn_code: String::new(),
                barcode: String::new(),
                quantity: qty,
                unit: "PCS".to_string(),
                unit_price: Money::from_paise(total.paise() / qty),
                mrp: Money::from_paise(total.paise() / qty),
                taxable_amount: total,
                cgst_pct: TaxRate::DEFAULT_COMPONENT,
                cgst_amount: Money::zero(),
                sgst_pct: TaxRate::DEFAULT_COMPONENT,
                sgst_amount: Money::zero(),
                total,
            })
            .await
            .unwrap();
    }

    fn service(db: &Database) -> ReportService {
        ReportService::new(db.clone(), CheckoutConfig::default())
    }

    #[test]
    fn test_day_range_follows_offset() {
        let range = DateRange::day(date(15), ist());
        assert_eq!(range.from, at(14, 18, 30));
        assert_eq!(range.to, at(15, 18, 30));
        assert!(range.contains(at(15, 18, 29)));
        assert!(!range.contains(at(15, 18, 30)));
    }

    #[tokio::test]
    async fn test_summary_skips_revised_rows() {
        let db = Database::memory();
        invoice(&db, at(15, 5, 0), 1000, InvoiceStatus::Completed).await;
        invoice(&db, at(15, 6, 0), 400, InvoiceStatus::Revised).await;
        invoice(&db, at(15, 20, 0), 2000, InvoiceStatus::Completed).await;

        let service = service(&db);
        let summary = service.sales_summary(service.range(date(15), date(15))).await.unwrap();
        // 20:00 UTC on the 15th is already the 16th in IST
        assert_eq!(summary.invoice_count, 1);
        assert_eq!(summary.grand_total, Money::from_rupees(1000));

        let both = service.sales_summary(service.range(date(15), date(16))).await.unwrap();
        assert_eq!(both.invoice_count, 2);
        assert_eq!(both.grand_total, Money::from_rupees(3000));
    }

    #[tokio::test]
    async fn test_daily_summary_groups_by_local_day() {
        let db = Database::memory();
        invoice(&db, at(14, 19, 0), 500, InvoiceStatus::Completed).await;
        invoice(&db, at(15, 4, 0), 700, InvoiceStatus::Completed).await;
        invoice(&db, at(16, 4, 0), 900, InvoiceStatus::Completed).await;

        let service = service(&db);
        let days = service
            .daily_summary(service.range(date(15), date(16)))
            .await
            .unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, date(15));
        assert_eq!(days[0].summary.invoice_count, 2);
        assert_eq!(days[0].summary.grand_total, Money::from_rupees(1200));
        assert_eq!(days[1].date, date(16));
        assert_eq!(days[1].summary.grand_total, Money::from_rupees(900));
    }

    #[tokio::test]
    async fn test_product_sales_ranking() {
        let db = Database::memory();
        let a = invoice(&db, at(15, 5, 0), 3000, InvoiceStatus::Completed).await;
        let b = invoice(&db, at(15, 6, 0), 1800, InvoiceStatus::Completed).await;
        let old = invoice(&db, at(15, 7, 0), 9000, InvoiceStatus::Revised).await;
        line(&db, &a, Some("p_silk"), "Silk Saree", 2, 2000).await;
        line(&db, &a, None, "Saree - 1", 1, 1000).await;
        line(&db, &b, Some("p_silk"), "Silk Saree", 1, 1000).await;
        line(&db, &b, None, "Saree - 1", 1, 800).await;
        line(&db, &old, Some("p_silk"), "Silk Saree", 9, 9000).await;

        let service = service(&db);
        let rows = service
            .product_sales(service.range(date(15), date(15)))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].product.as_deref(), Some("p_silk"));
        assert_eq!(rows[0].quantity, 3);
        assert_eq!(rows[0].total, Money::from_rupees(3000));
        assert_eq!(rows[1].product, None);
        assert_eq!(rows[1].name, "Saree - 1");
        assert_eq!(rows[1].total, Money::from_rupees(1800));
    }

    #[tokio::test]
    async fn test_dashboard() {
        let db = Database::memory();
        let service = service(&db);
        invoice(&db, Utc::now(), 1500, InvoiceStatus::Completed).await;
        for (code, stock) in [("A", 2), ("B", -1), ("C", 10)] {
            db.products()
                .create(&Product {
                    id: String::new(),
                    product_code: code.to_string(),
                    name: code.to_string(),
                    description: None,
                    hsn_code: None,
                    purchase_price: None,
                    retail_price: Money::from_rupees(100),
                    mrp: Money::from_rupees(100),
                    wholesale_price: None,
                    cgst_pct: None,
                    sgst_pct: None,
                    unit: None,
                    barcode: None,
                    min_stock: 5,
                    current_stock: stock,
                    active: true,
                })
                .await
                .unwrap();
        }

        let stats = service.dashboard().await.unwrap();
        assert_eq!(stats.today_invoices, 1);
        assert_eq!(stats.today_sales, Money::from_rupees(1500));
        assert_eq!(stats.low_stock, 1);
        assert_eq!(stats.negative_stock, 1);
    }
}
