//! # dukaan-store: Record Store for Dukaan
//!
//! Persistence for the billing core. Everything is a JSON record in a
//! named collection; typed repositories decode them into domain types.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Dukaan Data Flow                                 │
//! │                                                                         │
//! │  Checkout service (finalize_invoice)                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   dukaan-store (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  RecordStore │  │   │
//! │  │   │ (database.rs) │───►│ product.rs    │───►│  (store.rs)  │  │   │
//! │  │   │               │    │ invoice.rs    │    │              │  │   │
//! │  │   │ repo factory  │    │ settings.rs   │    │ Memory/SQLite│  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   records (JSON payloads) + record_uniques                      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`store`] - The `RecordStore` trait
//! - [`record`] - Collections, schemas, filters, paging
//! - [`memory`] - In-memory backend
//! - [`pool`] - SQLite backend and connection pool
//! - [`migrations`] - Embedded database migrations
//! - [`repository`] - Typed repositories
//! - [`error`] - Store error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dukaan_store::{Database, DbConfig};
//!
//! let db = Database::sqlite(DbConfig::new("path/to/dukaan.db")).await?;
//! let hits = db.products().search("silk", 1, 20).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod database;
pub mod error;
pub mod memory;
pub mod migrations;
pub mod pool;
pub mod record;
pub mod repository;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use database::Database;
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use pool::{DbConfig, SqliteStore};
pub use record::{Collection, Filter, ListQuery, ListResult, Record, Sort};
pub use store::{RecordStore, SharedStore, INVOICE_COUNTER_KEY};

// Repository re-exports for convenience
pub use repository::customer::CustomerRepository;
pub use repository::invoice::{InvoiceRepository, InvoiceWithCustomer};
pub use repository::product::ProductRepository;
pub use repository::settings::{SettingsRepository, ShopSettings};
pub use repository::stock::{MovementWithProduct, StockRepository};
pub use repository::supplier::SupplierRepository;
