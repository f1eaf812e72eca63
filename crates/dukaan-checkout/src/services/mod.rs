//! # Services
//!
//! The multi-step flows UI handlers call. Each service owns clones of the
//! handles it needs; all of them are cheap to clone.
//!
//! ```text
//! services/
//! ├── checkout.rs    ◄─── finalize, revise, load for edit, invoice detail
//! ├── adjustment.rs  ◄─── post-finalize stepper on a completed invoice
//! ├── customer.rs    ◄─── mobile lookup, create-or-reread, walk-in
//! ├── catalog.rs     ◄─── scan, search, quick-add
//! ├── stock.rs       ◄─── sale/return hooks, manual adjustments, levels
//! └── reports.rs     ◄─── daily summary, GST register, product sales
//! ```

pub mod adjustment;
pub mod catalog;
pub mod checkout;
pub mod customer;
pub mod reports;
pub mod stock;

pub use adjustment::AdjustmentService;
pub use catalog::CatalogService;
pub use checkout::{CheckoutService, FinalizeOutcome, InvoiceDetail};
pub use customer::CustomerService;
pub use reports::{DailySales, DashboardStats, DateRange, ProductSales, ReportService, SalesSummary};
pub use stock::StockService;
