//! # dukaan-checkout: Counter Session Layer
//!
//! What the billing screens call into. One [`Session`] per terminal owns
//! the cart, the cached shop settings and the services that run against
//! the record store.
//!
//! ## Module Organization
//! ```text
//! dukaan_checkout/
//! ├── lib.rs          ◄─── Session setup, logging init
//! ├── config.rs       ◄─── Terminal config (toml + DUKAAN_* env)
//! ├── error.rs        ◄─── CheckoutError, ErrorCode, ErrorResponse
//! ├── state/
//! │   ├── cart.rs     ◄─── CartState: Mutex<Cart> + snapshot file
//! │   └── settings.rs ◄─── SettingsCache
//! └── services/
//!     ├── checkout.rs ◄─── finalize / revise
//!     ├── adjustment.rs
//!     ├── customer.rs
//!     ├── catalog.rs
//!     ├── stock.rs
//!     └── reports.rs
//! ```
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Session::open                                   │
//! │                                                                         │
//! │  1. Connect ─────────► SQLite at store.database_path, migrations run    │
//! │  2. Seed ────────────► default settings rows that are missing           │
//! │  3. Cart ────────────► restore session.cart_path snapshot if present    │
//! │  4. Services ────────► share the Database and SettingsCache handles     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod services;
pub mod state;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use dukaan_store::Database;

pub use config::{AllocationMode, CheckoutConfig};
pub use error::{CheckoutError, CheckoutResult, ErrorCode, ErrorResponse};
pub use services::{
    AdjustmentService, CatalogService, CheckoutService, CustomerService, FinalizeOutcome,
    InvoiceDetail, ReportService, StockService,
};
pub use state::{CartState, SettingsCache};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,dukaan=debug,sqlx=warn";

/// Everything one billing terminal needs.
#[derive(Debug, Clone)]
pub struct Session {
    config: CheckoutConfig,
    db: Database,
    cart: CartState,
    settings: SettingsCache,
}

impl Session {
    /// Opens the configured SQLite database and restores the cart.
    pub async fn open(config: CheckoutConfig) -> CheckoutResult<Self> {
        config.validate()?;
        if let Some(dir) = config.store.database_path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }

        let db = Database::sqlite(config.db_config()).await?;
        info!(path = ?config.store.database_path, terminal = %config.terminal.name, "Database connected");
        Self::start(config, db).await
    }

    /// Session over the in-memory backend.
    pub async fn in_memory(config: CheckoutConfig) -> CheckoutResult<Self> {
        Self::start(config, Database::memory()).await
    }

    async fn start(config: CheckoutConfig, db: Database) -> CheckoutResult<Self> {
        let seeded = db.settings().seed_defaults().await?;
        if seeded > 0 {
            info!(seeded, "Default shop settings written");
        }

        let cart = match &config.session.cart_path {
            Some(path) => CartState::persistent(path),
            None => CartState::new(),
        };
        match cart.restore() {
            Ok(true) => info!("Cart restored from last session"),
            Ok(false) => {}
            Err(e) => {
                warn!(error = %e, "Cart snapshot unreadable, starting empty");
                cart.clear_all()?;
            }
        }

        Ok(Session {
            settings: SettingsCache::new(db.clone()),
            config,
            db,
            cart,
        })
    }

    pub fn config(&self) -> &CheckoutConfig {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn cart(&self) -> &CartState {
        &self.cart
    }

    pub fn settings(&self) -> &SettingsCache {
        &self.settings
    }

    pub fn checkout(&self) -> CheckoutService {
        CheckoutService::new(self.db.clone(), self.settings.clone(), self.config.clone())
    }

    pub fn adjustments(&self) -> AdjustmentService {
        AdjustmentService::new(self.db.clone(), self.settings.clone(), self.config.clone())
    }

    pub fn catalog(&self) -> CatalogService {
        CatalogService::new(self.db.clone(), self.settings.clone(), self.config.clone())
    }

    pub fn customers(&self) -> CustomerService {
        CustomerService::new(self.db.clone())
    }

    pub fn stock(&self) -> StockService {
        StockService::new(self.db.clone())
    }

    pub fn reports(&self) -> ReportService {
        ReportService::new(self.db.clone(), self.config.clone())
    }
}

/// Installs the global tracing subscriber.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=dukaan_checkout=trace` - Trace for one crate
/// - Default: [`DEFAULT_LOG_FILTER`]
///
/// Calling it twice is harmless; the second call does nothing.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use dukaan_core::{Money, Product};
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("dukaan-lib-{}-{}", std::process::id(), name))
    }

    #[tokio::test]
    async fn test_in_memory_session_sells() {
        init_tracing();
        init_tracing();
        let session = Session::in_memory(CheckoutConfig::default()).await.unwrap();
        let product = session
            .catalog()
            .quick_add("Kota Saree", Money::from_rupees(1200), None)
            .await
            .unwrap();
        session.cart().update(|c| c.add_item(&product)).unwrap();

        let outcome = session.checkout().finalize(session.cart()).await.unwrap();
        assert_eq!(outcome.invoice.grand_total, Money::from_rupees(1200));
        assert_eq!(session.reports().dashboard().await.unwrap().today_invoices, 1);
        let stocked: Product = session.database().products().get(&product.id).await.unwrap();
        assert_eq!(stocked.current_stock, -1);
    }

    #[tokio::test]
    async fn test_cart_survives_restart() {
        let cart_path = temp_path("cart.json");
        let _ = std::fs::remove_file(&cart_path);
        let mut config = CheckoutConfig::default();
        config.session.cart_path = Some(cart_path.clone());

        let first = Session::in_memory(config.clone()).await.unwrap();
        first.cart().update(|c| c.add_quick_lines(2)).unwrap();

        let second = Session::in_memory(config.clone()).await.unwrap();
        assert_eq!(second.cart().with_cart(|c| c.items().len()), 2);

        std::fs::write(&cart_path, "not json").unwrap();
        let third = Session::in_memory(config).await.unwrap();
        assert!(third.cart().with_cart(|c| c.is_empty()));
        assert!(!cart_path.exists());
    }

    #[tokio::test]
    async fn test_sqlite_session() {
        let mut config = CheckoutConfig::default();
        config.store.database_path = temp_path("shop.db");
        let remove_db = || {
            for suffix in ["", "-wal", "-shm"] {
                let mut path = config.store.database_path.clone().into_os_string();
                path.push(suffix);
                let _ = std::fs::remove_file(path);
            }
        };
        remove_db();

        let session = Session::open(config.clone()).await.unwrap();
        assert_eq!(
            session.checkout().next_invoice_number().await.unwrap(),
            "GST-0001-2025/26"
        );
        drop(session);
        remove_db();
    }
}
