//! # Domain Types
//!
//! Core domain types used throughout Dukaan.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    Invoice      │   │ InvoiceLineItem │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  id             │   │  invoice (FK)   │       │
//! │  │  product_code   │   │  invoice_number │   │  name snapshot  │       │
//! │  │  retail_price   │   │  status         │   │  rates snapshot │       │
//! │  │  cgst/sgst pct  │   │  grand_total    │   │  amounts        │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    TaxRate      │   │  InvoiceStatus  │   │ StockMovement   │       │
//! │  │  bps (u32)      │   │  Draft          │   │  append-only    │       │
//! │  │  250 = 2.5%     │   │  Completed      │   │  signed qty     │       │
//! │  └─────────────────┘   │  Cancelled      │   │  balance_after  │       │
//! │                        │  Revised        │   └─────────────────┘       │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Record Shape
//! Field names match the record-store collections (`snake_case`), so a
//! record payload decodes straight into these structs. Amounts travel as
//! decimal rupees and rates as percentages.

use chrono::{DateTime, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01%, so the 2.5% CGST slab is exactly 250 bps and
/// never drifts through float math. The store keeps rates as percentage
/// numbers (`2.5`), which is what serde reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TaxRate(u32);

impl TaxRate {
    /// 2.5%, the default CGST and SGST component for textiles.
    pub const DEFAULT_COMPONENT: TaxRate = TaxRate(250);

    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage. Negative input clamps to zero.
    pub fn from_percentage(pct: f64) -> Self {
        if !pct.is_finite() || pct <= 0.0 {
            return TaxRate(0);
        }
        TaxRate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display and storage).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Returns `self`, or `fallback` when unset or zero.
    ///
    /// Catalog records leave rates blank (or at zero) when the shop default
    /// applies.
    pub fn or_default_to(rate: Option<TaxRate>, fallback: TaxRate) -> TaxRate {
        match rate {
            Some(r) if !r.is_zero() => r,
            _ => fallback,
        }
    }
}

impl fmt::Display for TaxRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percentage())
    }
}

impl Serialize for TaxRate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.percentage())
    }
}

struct TaxRateVisitor;

impl<'de> Visitor<'de> for TaxRateVisitor {
    type Value = TaxRate;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a tax percentage as a number or numeric string")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<TaxRate, E> {
        Ok(TaxRate::from_percentage(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<TaxRate, E> {
        Ok(TaxRate::from_percentage(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<TaxRate, E> {
        Ok(TaxRate::from_percentage(v as f64))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<TaxRate, E> {
        v.trim()
            .trim_end_matches('%')
            .parse::<f64>()
            .map(TaxRate::from_percentage)
            .map_err(|_| E::custom(format!("'{}' is not a tax percentage", v)))
    }

    fn visit_unit<E: de::Error>(self) -> Result<TaxRate, E> {
        Ok(TaxRate::zero())
    }
}

impl<'de> Deserialize<'de> for TaxRate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(TaxRateVisitor)
    }
}

// =============================================================================
// Enumerations
// =============================================================================

/// Invoice lifecycle status.
///
/// ```text
/// completed ──(edit)──► revised   (old row, kept for audit)
///     └─────────────►   completed (new row, same invoice_number)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    #[default]
    Completed,
    Cancelled,
    /// Superseded by a newer row with the same invoice number.
    Revised,
}

impl InvoiceStatus {
    /// Returns the stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Completed => "completed",
            InvoiceStatus::Cancelled => "cancelled",
            InvoiceStatus::Revised => "revised",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the customer paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Upi,
    Card,
    /// Goods handed over on account.
    Credit,
}

impl PaymentMethod {
    /// Returns the stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Upi => "upi",
            PaymentMethod::Card => "card",
            PaymentMethod::Credit => "credit",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "upi" => Ok(PaymentMethod::Upi),
            "card" => Ok(PaymentMethod::Card),
            "credit" => Ok(PaymentMethod::Credit),
            _ => Err(ValidationError::NotAllowed {
                field: "payment_method".to_string(),
                allowed: ["cash", "upi", "card", "credit"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            }),
        }
    }
}

/// Kind of inventory-affecting event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    Sale,
    Purchase,
    Adjustment,
    /// Initial quantity recorded at data-migration time.
    Opening,
    Return,
}

impl MovementType {
    /// Returns the stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Sale => "sale",
            MovementType::Purchase => "purchase",
            MovementType::Adjustment => "adjustment",
            MovementType::Opening => "opening",
            MovementType::Return => "return",
        }
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// A product in the shop catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default)]
    pub id: String,

    /// Business identifier, unique across the catalog.
    pub product_code: String,

    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    /// HSN classification code printed on GST invoices.
    #[serde(default)]
    pub hsn_code: Option<String>,

    #[serde(default)]
    pub purchase_price: Option<Money>,

    /// GST-inclusive selling price. Zero means "use MRP".
    #[serde(default)]
    pub retail_price: Money,

    /// Maximum retail price, GST-inclusive.
    #[serde(default)]
    pub mrp: Money,

    #[serde(default)]
    pub wholesale_price: Option<Money>,

    #[serde(default)]
    pub cgst_pct: Option<TaxRate>,

    #[serde(default)]
    pub sgst_pct: Option<TaxRate>,

    /// Unit of measure, e.g. `PCS` or `MTR`.
    #[serde(default)]
    pub unit: Option<String>,

    #[serde(default)]
    pub barcode: Option<String>,

    #[serde(default)]
    pub min_stock: i64,

    /// May go negative: the shop sells before stock entry catches up.
    #[serde(default)]
    pub current_stock: i64,

    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

impl Product {
    /// The price a new cart line starts at: retail price, else MRP.
    pub fn selling_price(&self) -> Money {
        if self.retail_price.is_positive() {
            self.retail_price
        } else {
            self.mrp
        }
    }

    /// Stock is below the reorder threshold but not negative.
    pub fn is_low_stock(&self) -> bool {
        self.current_stock >= 0 && self.current_stock < self.min_stock
    }
}

// =============================================================================
// Parties
// =============================================================================

/// A customer, keyed by mobile number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    #[serde(default)]
    pub id: String,
    pub name: String,
    /// Unique across customers. `0000000000` is the walk-in cash customer.
    pub mobile: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub gstin: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Mobile number of the shared walk-in customer.
pub const WALK_IN_MOBILE: &str = "0000000000";

impl Customer {
    /// True for the shared walk-in record.
    pub fn is_walk_in(&self) -> bool {
        self.mobile == WALK_IN_MOBILE
    }
}

/// A supplier of stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Supplier {
    #[serde(default)]
    pub id: String,
    /// Unique across suppliers.
    pub supplier_code: String,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub gstin: Option<String>,
    #[serde(default)]
    pub opening_balance: Option<Money>,
    #[serde(default = "default_true")]
    pub active: bool,
}

// =============================================================================
// Invoice
// =============================================================================

/// Invoice header. Immutable once created, except for `status` (set to
/// `revised` when superseded) and the post-finalize adjustment fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    #[serde(default)]
    pub id: String,

    /// Shared by every revision of the same sale; not unique.
    pub invoice_number: String,

    pub invoice_date: DateTime<Utc>,

    /// Customer record id.
    pub customer: String,

    #[serde(default = "default_tax_type")]
    pub tax_type: String,

    pub subtotal: Money,

    #[serde(default)]
    pub discount_total: Money,

    #[serde(default)]
    pub cgst_total: Money,

    #[serde(default)]
    pub sgst_total: Money,

    pub grand_total: Money,

    #[serde(default)]
    pub amount_paid: Money,

    #[serde(default)]
    pub payment_method: PaymentMethod,

    pub status: InvoiceStatus,

    /// Post-hoc negotiated reduction beyond the discount.
    #[serde(default)]
    pub adjustment: Money,

    #[serde(default)]
    pub notes: Option<String>,

    /// User record id of the cashier.
    #[serde(default)]
    pub created_by: Option<String>,
}

fn default_tax_type() -> String {
    "GST".to_string()
}

/// Notes marker for invoices loaded from historical data; their stock was
/// already accounted for in opening balances.
pub const IMPORT_MARKER: &str = "__import__";

impl Invoice {
    /// True when this invoice came from a historical import.
    pub fn is_import(&self) -> bool {
        self.notes.as_deref() == Some(IMPORT_MARKER)
    }

    /// Amount the adjustment stepper works against.
    pub fn after_discount(&self) -> Money {
        self.subtotal - self.discount_total
    }
}

/// One line of a persisted invoice, carrying a snapshot of the product at
/// time of sale so later catalog edits do not alter history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLineItem {
    #[serde(default)]
    pub id: String,

    /// Invoice header id.
    pub invoice: String,

    /// Catalog product id; `None` for ad-hoc quick lines.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub product: Option<String>,

    pub product_name: String,

    #[serde(default)]
    pub product_code: String,

    #[serde(default)]
    pub hsn_code: String,

    #[serde(default)]
    pub barcode: String,

    pub quantity: i64,

    #[serde(default = "default_unit")]
    pub unit: String,

    pub unit_price: Money,

    #[serde(default)]
    pub mrp: Money,

    pub taxable_amount: Money,

    #[serde(default)]
    pub cgst_pct: TaxRate,

    #[serde(default)]
    pub cgst_amount: Money,

    #[serde(default)]
    pub sgst_pct: TaxRate,

    #[serde(default)]
    pub sgst_amount: Money,

    /// `unit_price × quantity`, GST-inclusive.
    pub total: Money,
}

/// Default unit of measure.
pub const DEFAULT_UNIT: &str = "PCS";

fn default_unit() -> String {
    DEFAULT_UNIT.to_string()
}

/// Relation fields arrive as `""` when unset.
fn empty_as_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

// =============================================================================
// Stock Ledger
// =============================================================================

/// Append-only inventory ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMovement {
    #[serde(default)]
    pub id: String,

    pub product: String,

    #[serde(rename = "type")]
    pub movement_type: MovementType,

    /// Signed: sales are negative, purchases and returns positive.
    pub quantity: i64,

    #[serde(default)]
    pub balance_after: Option<i64>,

    #[serde(default)]
    pub reference_type: Option<String>,

    #[serde(default)]
    pub reference_id: Option<String>,

    #[serde(default)]
    pub notes: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================
