//! # Error Types
//!
//! Domain-specific error types for dukaan-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  dukaan-core errors (this file)                                        │
//! │  ├── CoreError        - Billing rule violations                        │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  dukaan-store errors (separate crate)                                  │
//! │  └── StoreError       - Record store failures                          │
//! │                                                                         │
//! │  dukaan-checkout errors                                                │
//! │  └── CheckoutError    - What the checkout screen sees                  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → CheckoutError → UI notice         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Billing rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Finalize was attempted on a cart with no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// One or more lines have no price.
    ///
    /// ## User Workflow
    /// ```text
    /// Generate Invoice
    ///      │
    ///      ▼
    /// 2 quick lines still at ₹0
    ///      │
    ///      ▼
    /// MissingPrice { count: 2 }  →  "2 item(s) missing price"
    /// ```
    #[error("{count} item(s) missing price")]
    MissingPrice { count: usize },

    /// Cart line position does not exist.
    #[error("No cart line at position {index} (cart has {len} lines)")]
    LineOutOfRange { index: usize, len: usize },

    /// Invoice is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Editing an invoice that was already superseded (`revised`)
    /// - Adjusting a cancelled invoice
    #[error("Invoice {invoice_number} is {status}, cannot {operation}")]
    InvalidInvoiceStatus {
        invoice_number: String,
        status: String,
        operation: String,
    },

    /// More than one live row exists for one invoice number.
    #[error("Invoice {invoice_number} has {live} non-revised rows")]
    RevisionConflict { invoice_number: String, live: usize },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., malformed mobile number or amount).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;
