//! # Validation Module
//!
//! Input checks applied before records reach the store.
//!
//! ```text
//! UI input ──► this module (format, ranges) ──► store schema (required, unique)
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::WALK_IN_MOBILE;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Shortest mobile number accepted for a named customer.
pub const MIN_MOBILE_DIGITS: usize = 10;

/// Largest quantity a single cart line accepts.
pub const MAX_LINE_QUANTITY: i64 = 9_999;

/// Highest GST component rate, in percent.
pub const MAX_COMPONENT_RATE_PCT: i64 = 28;

// =============================================================================
// Customers
// =============================================================================

/// Normalizes a typed mobile number to bare digits.
///
/// Spaces, dashes and a leading `+91` are dropped.
pub fn normalize_mobile(mobile: &str) -> String {
    let digits: String = mobile.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() == 12 && digits.starts_with("91") {
        digits[2..].to_string()
    } else {
        digits
    }
}

/// True when `mobile` should resolve to a named customer record rather
/// than the walk-in customer.
pub fn is_registrable_mobile(mobile: &str) -> bool {
    let digits = normalize_mobile(mobile);
    digits.len() >= MIN_MOBILE_DIGITS && digits != WALK_IN_MOBILE
}

/// Validates a customer mobile number and returns it normalized.
pub fn validate_mobile(mobile: &str) -> ValidationResult<String> {
    let digits = normalize_mobile(mobile);
    if digits.is_empty() {
        return Err(ValidationError::Required {
            field: "mobile".to_string(),
        });
    }
    if digits.len() < MIN_MOBILE_DIGITS {
        return Err(ValidationError::InvalidFormat {
            field: "mobile".to_string(),
            reason: format!("must have at least {} digits", MIN_MOBILE_DIGITS),
        });
    }
    Ok(digits)
}

// =============================================================================
// Catalog
// =============================================================================

/// Validates a product code.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Letters, numbers, hyphens, underscores and slashes only
pub fn validate_product_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "product_code".to_string(),
        });
    }

    if code.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "product_code".to_string(),
            max: 50,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '/')
    {
        return Err(ValidationError::InvalidFormat {
            field: "product_code".to_string(),
            reason: "must contain only letters, numbers, hyphens, underscores and slashes"
                .to_string(),
        });
    }

    Ok(())
}

/// Validates a product or customer name (1 to 200 characters).
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(())
}

// =============================================================================
// Amounts
// =============================================================================

/// Validates a line quantity.
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if !(1..=MAX_LINE_QUANTITY).contains(&quantity) {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }
    Ok(())
}

/// Validates a selling price entered by hand.
pub fn validate_price(price: Money) -> ValidationResult<()> {
    if !price.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "price".to_string(),
        });
    }
    Ok(())
}

/// Validates a GST component percentage.
pub fn validate_tax_rate_pct(pct: f64) -> ValidationResult<()> {
    if !pct.is_finite() || pct < 0.0 || pct > MAX_COMPONENT_RATE_PCT as f64 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: MAX_COMPONENT_RATE_PCT,
        });
    }
    Ok(())
}

/// Validates a signed manual stock change.
pub fn validate_stock_change(quantity: i64) -> ValidationResult<()> {
    if quantity == 0 {
        return Err(ValidationError::Required {
            field: "quantity".to_string(),
        });
    }
    Ok(())
}
