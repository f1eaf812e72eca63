//! # Checkout Errors
//!
//! One error type for every session operation, plus the serializable
//! response a UI shows.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Dukaan                                 │
//! │                                                                         │
//! │  UI handler                  Session layer                              │
//! │  ──────────                  ─────────────                              │
//! │                                                                         │
//! │  finalize()                                                             │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Cart rule broken? ── CoreError::MissingPrice ─► blocking notice │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Store call failed? ── StoreError ─► SaveFailed ─► generic       │  │
//! │  │         │                          "Failed to save invoice"      │  │
//! │  │         ▼                          (cart left intact)            │  │
//! │  │  Line write failed after header? ─► PartialFinalize              │  │
//! │  │         │                          (header orphaned, no rollback)│  │
//! │  │         ▼                                                        │  │
//! │  │  Success                                                         │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  ErrorResponse { code: "MISSING_PRICE", message: "2 item(s) ..." }      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use thiserror::Error;

use dukaan_core::{CoreError, ValidationError};
use dukaan_store::StoreError;

/// Notice shown when any store call fails during finalize.
pub const SAVE_FAILED_MESSAGE: &str = "Failed to save invoice";

/// Errors from session operations.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// A billing rule was broken (empty cart, unpriced lines, bad status).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A store call failed outside of finalize.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A store call failed during finalize before any header was written.
    /// The cart is left as it was.
    #[error("Failed to save invoice")]
    SaveFailed {
        #[source]
        source: StoreError,
    },

    /// The header exists but not every line item was written.
    ///
    /// There is no rollback: the caller must reconcile the orphaned
    /// header before retrying.
    #[error("Invoice {invoice_number} saved with {saved} of {expected} items")]
    PartialFinalize {
        invoice_id: String,
        invoice_number: String,
        saved: usize,
        expected: usize,
        #[source]
        source: StoreError,
    },

    /// The configuration file or environment is invalid.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A config or snapshot file could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted cart snapshot is not valid JSON.
    #[error("Cart snapshot unreadable: {0}")]
    Snapshot(#[from] serde_json::Error),
}

impl From<ValidationError> for CheckoutError {
    fn from(err: ValidationError) -> Self {
        CheckoutError::Core(CoreError::Validation(err))
    }
}

impl From<toml::de::Error> for CheckoutError {
    fn from(err: toml::de::Error) -> Self {
        CheckoutError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for CheckoutError {
    fn from(err: toml::ser::Error) -> Self {
        CheckoutError::Config(err.to_string())
    }
}

impl CheckoutError {
    /// Wraps a store failure met while finalizing.
    pub fn save_failed(source: StoreError) -> Self {
        CheckoutError::SaveFailed { source }
    }
}

/// Result type for session operations.
pub type CheckoutResult<T> = Result<T, CheckoutError>;

// =============================================================================
// UI Response
// =============================================================================

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Record not found
    NotFound,

    /// Input validation failed
    ValidationError,

    /// Duplicate product code, mobile or key
    Duplicate,

    /// Cart has no lines
    EmptyCart,

    /// Cart has lines still at ₹0
    MissingPrice,

    /// Invoice status does not allow the operation
    InvalidStatus,

    /// Finalize failed; the cart is unchanged
    SaveFailed,

    /// Header saved without all its items
    PartialSave,

    /// Store or file system failure
    StorageError,

    /// Anything else
    Internal,
}

/// What a UI handler receives when an operation fails.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ErrorResponse {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl From<&StoreError> for ErrorResponse {
    fn from(err: &StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => ErrorResponse::new(ErrorCode::NotFound, err.to_string()),
            StoreError::MissingField { .. } => {
                ErrorResponse::new(ErrorCode::ValidationError, err.to_string())
            }
            StoreError::UniqueViolation { .. } => {
                ErrorResponse::new(ErrorCode::Duplicate, err.to_string())
            }
            StoreError::ConnectionFailed(_) | StoreError::PoolExhausted => {
                ErrorResponse::new(ErrorCode::StorageError, "Database unavailable")
            }
            StoreError::Decode { .. }
            | StoreError::MigrationFailed(_)
            | StoreError::QueryFailed(_)
            | StoreError::Internal(_) => {
                // Log the actual error but return a generic message
                tracing::error!("Store operation failed: {}", err);
                ErrorResponse::new(ErrorCode::StorageError, "Database operation failed")
            }
        }
    }
}

impl From<&CheckoutError> for ErrorResponse {
    fn from(err: &CheckoutError) -> Self {
        match err {
            CheckoutError::Core(core) => {
                let code = match core {
                    CoreError::EmptyCart => ErrorCode::EmptyCart,
                    CoreError::MissingPrice { .. } => ErrorCode::MissingPrice,
                    CoreError::InvalidInvoiceStatus { .. } | CoreError::RevisionConflict { .. } => {
                        ErrorCode::InvalidStatus
                    }
                    CoreError::LineOutOfRange { .. } | CoreError::Validation(_) => {
                        ErrorCode::ValidationError
                    }
                };
                ErrorResponse::new(code, core.to_string())
            }
            CheckoutError::Store(store) => ErrorResponse::from(store),
            CheckoutError::SaveFailed { source } => {
                tracing::error!("Invoice save failed: {}", source);
                ErrorResponse::new(ErrorCode::SaveFailed, SAVE_FAILED_MESSAGE)
            }
            CheckoutError::PartialFinalize { .. } => {
                ErrorResponse::new(ErrorCode::PartialSave, err.to_string())
            }
            CheckoutError::Config(_) => ErrorResponse::new(ErrorCode::ValidationError, err.to_string()),
            CheckoutError::Io(_) => ErrorResponse::new(ErrorCode::StorageError, err.to_string()),
            CheckoutError::Snapshot(_) => ErrorResponse::new(ErrorCode::Internal, err.to_string()),
        }
    }
}

impl From<CheckoutError> for ErrorResponse {
    fn from(err: CheckoutError) -> Self {
        ErrorResponse::from(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_price_is_blocking_notice() {
        let err = CheckoutError::from(CoreError::MissingPrice { count: 2 });
        let response = ErrorResponse::from(&err);
        assert_eq!(response.code, ErrorCode::MissingPrice);
        assert_eq!(response.message, "2 item(s) missing price");
    }

    #[test]
    fn test_save_failed_hides_store_detail() {
        let err = CheckoutError::save_failed(StoreError::QueryFailed("disk I/O error".into()));
        assert_eq!(err.to_string(), "Failed to save invoice");
        let response = ErrorResponse::from(err);
        assert_eq!(response.code, ErrorCode::SaveFailed);
        assert_eq!(response.message, "Failed to save invoice");
    }

    #[test]
    fn test_duplicate_maps_to_code() {
        let err = CheckoutError::from(StoreError::duplicate("mobile", "9876543210"));
        let response = ErrorResponse::from(&err);
        assert_eq!(response.code, ErrorCode::Duplicate);
        assert!(response.message.contains("9876543210"));
    }

    #[test]
    fn test_error_code_serialization() {
        let json = serde_json::to_string(&ErrorResponse::new(ErrorCode::PartialSave, "x")).unwrap();
        assert_eq!(json, r#"{"code":"PARTIAL_SAVE","message":"x"}"#);
    }
}
