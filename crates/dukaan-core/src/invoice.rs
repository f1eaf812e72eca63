//! # Invoice Rules
//!
//! Numbering, the cart-to-invoice conversion, the revision protocol and
//! post-finalize adjustments. All pure: the checkout layer does the I/O.
//!
//! ## Invoice Number
//! ```text
//!   GST - 0042 - 2025/26
//!   ───   ────   ───────
//!   prefix counter financial year (April to March)
//! ```
//!
//! ## Revision Protocol
//! ```text
//! {completed} ──edit──► {revised, completed} ──edit──► {revised, revised, completed}
//!
//! Every row shares the invoice number. At most one row is not `revised`.
//! ```

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::cart::Cart;
use crate::discount::{clamp_discount, next_discount, prev_discount};
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::tax::extract_tax;
use crate::types::{Invoice, InvoiceLineItem, InvoiceStatus, TaxRate};

/// Prefix used when the shop has not configured one.
pub const DEFAULT_INVOICE_PREFIX: &str = "GST";

/// Financial year used when the shop has not configured one and no date
/// is at hand.
pub const DEFAULT_FINANCIAL_YEAR: &str = "2025/26";

/// Tax type stamped on every header.
pub const TAX_TYPE_GST: &str = "GST";

// =============================================================================
// Numbering
// =============================================================================

/// A formatted invoice number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InvoiceNumber {
    pub prefix: String,
    pub counter: u64,
    pub financial_year: String,
}

impl fmt::Display for InvoiceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:04}-{}", self.prefix, self.counter, self.financial_year)
    }
}

impl FromStr for InvoiceNumber {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "invoice_number".to_string(),
            reason: reason.to_string(),
        };

        let mut parts = s.trim().rsplitn(3, '-');
        let financial_year = parts.next().filter(|p| !p.is_empty());
        let counter = parts.next();
        let prefix = parts.next().filter(|p| !p.is_empty());

        match (prefix, counter, financial_year) {
            (Some(prefix), Some(counter), Some(financial_year)) => Ok(InvoiceNumber {
                prefix: prefix.to_string(),
                counter: counter
                    .parse()
                    .map_err(|_| invalid("counter is not a number"))?,
                financial_year: financial_year.to_string(),
            }),
            _ => Err(invalid("expected PREFIX-NNNN-YYYY/YY")),
        }
    }
}

/// Indian financial year containing `date`, e.g. `"2025/26"` for any date
/// from 1 April 2025 to 31 March 2026.
pub fn financial_year_for(date: NaiveDate) -> String {
    let start = if date.month() >= 4 {
        date.year()
    } else {
        date.year() - 1
    };
    format!("{}/{:02}", start, (start + 1).rem_euclid(100))
}

/// Numbering state read from shop settings.
///
/// `counter` is the last number issued; the next invoice takes
/// `counter + 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceSequence {
    pub prefix: String,
    pub financial_year: String,
    pub counter: u64,
}

impl Default for InvoiceSequence {
    fn default() -> Self {
        InvoiceSequence {
            prefix: DEFAULT_INVOICE_PREFIX.to_string(),
            financial_year: DEFAULT_FINANCIAL_YEAR.to_string(),
            counter: 0,
        }
    }
}

impl InvoiceSequence {
    /// Number the next invoice would take. Does not advance the sequence.
    pub fn candidate(&self) -> InvoiceNumber {
        self.number_for(self.counter + 1)
    }

    /// Number for an already-reserved counter value.
    pub fn number_for(&self, counter: u64) -> InvoiceNumber {
        InvoiceNumber {
            prefix: self.prefix.clone(),
            counter,
            financial_year: self.financial_year.clone(),
        }
    }

    /// Records that `number` was issued.
    pub fn advance_to(&mut self, number: &InvoiceNumber) {
        self.counter = self.counter.max(number.counter);
    }
}

// =============================================================================
// Draft
// =============================================================================

/// Header fields the cart does not know.
#[derive(Debug, Clone)]
pub struct DraftContext {
    pub invoice_number: String,
    pub customer_id: String,
    pub invoice_date: DateTime<Utc>,
    /// Rates used for the header tax totals.
    pub header_cgst: TaxRate,
    pub header_sgst: TaxRate,
    pub created_by: Option<String>,
    pub notes: Option<String>,
}

/// An invoice ready to persist: header first, then lines.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceDraft {
    pub header: Invoice,
    pub lines: Vec<InvoiceLineItem>,
}

impl InvoiceDraft {
    /// Converts the cart into a `completed` invoice.
    ///
    /// Header tax totals are extracted from the grand total (after
    /// discount), so they may differ from the sum of line taxes.
    pub fn from_cart(cart: &Cart, ctx: DraftContext) -> CoreResult<InvoiceDraft> {
        cart.validate_for_finalize()?;

        let grand_total = cart.grand_total();
        let header_tax = extract_tax(grand_total, ctx.header_cgst, ctx.header_sgst);

        let header = Invoice {
            id: String::new(),
            invoice_number: ctx.invoice_number,
            invoice_date: ctx.invoice_date,
            customer: ctx.customer_id,
            tax_type: TAX_TYPE_GST.to_string(),
            subtotal: cart.subtotal(),
            discount_total: cart.discount(),
            cgst_total: header_tax.cgst,
            sgst_total: header_tax.sgst,
            grand_total,
            amount_paid: grand_total,
            payment_method: cart.payment_method,
            status: InvoiceStatus::Completed,
            adjustment: Money::zero(),
            notes: ctx.notes,
            created_by: ctx.created_by,
        };

        let lines = cart
            .items()
            .iter()
            .map(|line| InvoiceLineItem {
                id: String::new(),
                invoice: String::new(),
                product: line.product_ref.catalog_id().map(str::to_string),
                product_name: line.name.clone(),
                product_code: line.product_code.clone(),
                hsn_code: line.hsn_code.clone(),
                barcode: line.barcode.clone(),
                quantity: line.quantity,
                unit: line.unit.clone(),
                unit_price: line.unit_price,
                mrp: line.mrp,
                taxable_amount: line.taxable_amount,
                cgst_pct: line.cgst_pct,
                cgst_amount: line.cgst_amount,
                sgst_pct: line.sgst_pct,
                sgst_amount: line.sgst_amount,
                total: line.line_total,
            })
            .collect();

        Ok(InvoiceDraft { header, lines })
    }

    /// Points every line at the persisted header.
    pub fn attach_lines(&mut self, invoice_id: &str) {
        for line in &mut self.lines {
            line.invoice = invoice_id.to_string();
        }
    }
}

// =============================================================================
// Revision
// =============================================================================

/// Checks that `invoice` may be superseded by an edit.
pub fn ensure_revisable(invoice: &Invoice) -> CoreResult<()> {
    match invoice.status {
        InvoiceStatus::Revised | InvoiceStatus::Cancelled => Err(CoreError::InvalidInvoiceStatus {
            invoice_number: invoice.invoice_number.clone(),
            status: invoice.status.to_string(),
            operation: "edit".to_string(),
        }),
        InvoiceStatus::Draft | InvoiceStatus::Completed => Ok(()),
    }
}

/// Returns the single live row among all rows sharing one number.
pub fn live_revision<'a>(invoice_number: &str, rows: &'a [Invoice]) -> CoreResult<&'a Invoice> {
    let mut live = rows.iter().filter(|r| r.status != InvoiceStatus::Revised);
    match (live.next(), live.next()) {
        (Some(row), None) => Ok(row),
        _ => Err(CoreError::RevisionConflict {
            invoice_number: invoice_number.to_string(),
            live: rows
                .iter()
                .filter(|r| r.status != InvoiceStatus::Revised)
                .count(),
        }),
    }
}

// =============================================================================
// Adjustment
// =============================================================================

/// A button press or typed value on the adjustment control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustmentStep {
    Up,
    Down,
    Set(Money),
}

/// Header fields rewritten by an adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustedTotals {
    pub adjustment: Money,
    pub grand_total: Money,
    pub cgst_total: Money,
    pub sgst_total: Money,
    pub amount_paid: Money,
}

impl AdjustedTotals {
    pub fn apply_to(&self, invoice: &mut Invoice) {
        invoice.adjustment = self.adjustment;
        invoice.grand_total = self.grand_total;
        invoice.cgst_total = self.cgst_total;
        invoice.sgst_total = self.sgst_total;
        invoice.amount_paid = self.amount_paid;
    }
}

/// Computes a post-finalize adjustment on a completed invoice.
///
/// The stepper works against `subtotal - discount_total`; the tax totals
/// are re-extracted from the new grand total.
pub fn adjust(
    invoice: &Invoice,
    step: AdjustmentStep,
    cgst: TaxRate,
    sgst: TaxRate,
) -> CoreResult<AdjustedTotals> {
    if invoice.status != InvoiceStatus::Completed {
        return Err(CoreError::InvalidInvoiceStatus {
            invoice_number: invoice.invoice_number.clone(),
            status: invoice.status.to_string(),
            operation: "adjust".to_string(),
        });
    }

    let base = invoice.after_discount();
    let adjustment = match step {
        AdjustmentStep::Up => next_discount(base, invoice.adjustment),
        AdjustmentStep::Down => prev_discount(base, invoice.adjustment),
        AdjustmentStep::Set(amount) => clamp_discount(amount, base),
    };

    let grand_total = base - adjustment;
    let tax = extract_tax(grand_total, cgst, sgst);
    Ok(AdjustedTotals {
        adjustment,
        grand_total,
        cgst_total: tax.cgst,
        sgst_total: tax.sgst,
        amount_paid: grand_total,
    })
}
