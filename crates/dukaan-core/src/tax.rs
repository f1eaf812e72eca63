//! # GST Extraction
//!
//! Shop prices are GST-inclusive. The tax is backed out of the price by
//! division rather than added on top.
//!
//! ## Algorithm
//! ```text
//! inclusive = ₹500.00, CGST 2.5%, SGST 2.5%
//!
//! taxable = round(500.00 / 1.05)    = ₹476.19
//! cgst    = round(476.19 × 2.5%)    = ₹11.90
//! sgst    = round(476.19 × 2.5%)    = ₹11.90
//! total   = 476.19 + 11.90 + 11.90  = ₹499.99
//! ```
//!
//! Each step rounds to the paisa on its own, so `total` may differ from the
//! inclusive input by up to two paise. That drift is accepted and never
//! corrected.

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::TaxRate;

/// Basis points in 100%.
const BPS_SCALE: i64 = 10_000;

/// Result of splitting a GST-inclusive amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaxBreakdown {
    /// Amount before tax.
    pub taxable: Money,
    /// Central GST component.
    pub cgst: Money,
    /// State GST component.
    pub sgst: Money,
    /// `taxable + cgst + sgst`.
    pub total: Money,
}

impl TaxBreakdown {
    /// Combined tax.
    pub fn tax(&self) -> Money {
        self.cgst + self.sgst
    }
}

/// Splits a GST-inclusive amount into taxable value and the two components.
///
/// Zero input yields all zeros. Pure and deterministic.
pub fn extract_tax(inclusive: Money, cgst: TaxRate, sgst: TaxRate) -> TaxBreakdown {
    let total_bps = cgst.bps() as i64 + sgst.bps() as i64;

    let taxable = inclusive.mul_ratio(BPS_SCALE, BPS_SCALE + total_bps);
    let cgst_amount = taxable.mul_ratio(cgst.bps() as i64, BPS_SCALE);
    let sgst_amount = taxable.mul_ratio(sgst.bps() as i64, BPS_SCALE);

    TaxBreakdown {
        taxable,
        cgst: cgst_amount,
        sgst: sgst_amount,
        total: taxable + cgst_amount + sgst_amount,
    }
}

/// [`extract_tax`] at the default 2.5% + 2.5% slab.
pub fn extract_default_tax(inclusive: Money) -> TaxBreakdown {
    extract_tax(inclusive, TaxRate::DEFAULT_COMPONENT, TaxRate::DEFAULT_COMPONENT)
}
