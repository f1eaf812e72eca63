//! # dukaan-core: Pure Billing Logic for Dukaan
//!
//! GST-inclusive billing for a small retail shop, as pure functions with
//! zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Dukaan Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  dukaan-checkout (session layer)                │   │
//! │  │    cart session ──► finalize / revise ──► stock ledger          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ dukaan-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌──────────┐ ┌─────────┐ ┌─────────┐ ┌────────┐  │   │
//! │  │   │  money  │ │   tax    │ │discount │ │  cart   │ │invoice │  │   │
//! │  │   │  Money  │ │ extract  │ │ stepper │ │  Cart   │ │ number │  │   │
//! │  │   └─────────┘ └──────────┘ └─────────┘ └─────────┘ └────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  dukaan-store (record store)                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money in integer paise
//! - [`types`] - Domain types (Product, Invoice, StockMovement, TaxRate)
//! - [`tax`] - GST extraction from inclusive prices
//! - [`discount`] - Stepped discount negotiation
//! - [`cart`] - The cart aggregate
//! - [`invoice`] - Numbering, drafts, revisions and adjustments
//! - [`validation`] - Input checks
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use dukaan_core::money::Money;
//! use dukaan_core::tax::extract_default_tax;
//!
//! let split = extract_default_tax(Money::from_rupees(1050));
//! assert_eq!(split.taxable, Money::from_rupees(1000));
//! assert_eq!(split.cgst, Money::from_rupees(25));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod discount;
pub mod error;
pub mod invoice;
pub mod money;
pub mod tax;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartLineItem, CartTotals, CheckoutStep, EditingInvoice, ProductRef};
pub use discount::{clamp_discount, next_discount, prev_discount};
pub use error::{CoreError, CoreResult, ValidationError};
pub use invoice::{
    adjust, AdjustedTotals, AdjustmentStep, DraftContext, InvoiceDraft, InvoiceNumber,
    InvoiceSequence,
};
pub use money::Money;
pub use tax::{extract_default_tax, extract_tax, TaxBreakdown};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// State stamped on customers created at the counter.
pub const DEFAULT_CUSTOMER_STATE: &str = "Madhya Pradesh";

/// Name given to customers created from a bare mobile number.
pub const DEFAULT_CUSTOMER_NAME: &str = "Customer";
