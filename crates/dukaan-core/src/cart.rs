//! # Cart Aggregate
//!
//! The in-progress bill on one checkout terminal.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Scan / pick product ───► add_item()        ───► qty+1 or new line      │
//! │  Quick bill button   ───► add_quick_lines() ───► "Saree - N" at ₹0      │
//! │  Change quantity     ───► update_quantity() ───► floor at 1            │
//! │  Type a price        ───► update_price()    ───► line recomputed       │
//! │  "−" / "+" buttons   ───► discount_up/down  ───► Discount Stepper      │
//! │  Edit old invoice    ───► load_for_edit()   ───► editing = Some(..)    │
//! │  Invoice saved       ───► clear(keep)       ───► empty, maybe same     │
//! │                                               customer                 │
//! │                                                                         │
//! │  Every mutation recomputes the touched line via the Tax Engine and     │
//! │  re-clamps the discount into [0, subtotal].                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## States
//! ```text
//! empty ──add──► populated ──finalize──► cleared (empty)
//!                    ▲  │
//!                    └──┘ mutations          editing flag is orthogonal
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::discount::{clamp_discount, next_discount, prev_discount};
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::tax::extract_tax;
use crate::validation::MAX_LINE_QUANTITY;
use crate::types::{
    Customer, Invoice, InvoiceLineItem, InvoiceStatus, PaymentMethod, Product, TaxRate,
    DEFAULT_UNIT,
};

/// Name stem for ad-hoc quick-bill lines.
pub const QUICK_LINE_PREFIX: &str = "Saree - ";

// =============================================================================
// Line Identity
// =============================================================================

/// Identity of a cart line.
///
/// Catalog lines merge when the same product is added again. Quick lines
/// have a throwaway key and never merge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ProductRef {
    Catalog(String),
    Quick(String),
}

impl ProductRef {
    /// Fresh key for an ad-hoc line.
    pub fn new_quick() -> Self {
        ProductRef::Quick(format!("quick_{}", Uuid::new_v4().simple()))
    }

    /// Catalog product id, if any.
    pub fn catalog_id(&self) -> Option<&str> {
        match self {
            ProductRef::Catalog(id) => Some(id),
            ProductRef::Quick(_) => None,
        }
    }
}

// =============================================================================
// Cart Line
// =============================================================================

/// One line of the cart.
///
/// The product fields are a snapshot taken when the line was added, so a
/// catalog edit mid-checkout does not change the bill. The amount fields
/// are derived by [`CartLineItem::recalculate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLineItem {
    pub product_ref: ProductRef,
    pub product_code: String,
    pub name: String,
    pub hsn_code: String,
    pub barcode: String,
    pub mrp: Money,
    /// GST-inclusive price per unit.
    pub unit_price: Money,
    pub quantity: i64,
    pub cgst_pct: TaxRate,
    pub sgst_pct: TaxRate,
    pub unit: String,

    /// Stock at time of adding, for the low-stock badge.
    #[serde(default)]
    pub current_stock: i64,
    #[serde(default)]
    pub min_stock: i64,

    pub line_total: Money,
    pub taxable_amount: Money,
    pub cgst_amount: Money,
    pub sgst_amount: Money,
}

impl CartLineItem {
    /// New line at quantity 1 from a catalog product.
    ///
    /// Price is retail, else MRP. Rates missing from the product fall back
    /// to 2.5% + 2.5%.
    pub fn from_product(product: &Product) -> Self {
        let mut line = CartLineItem {
            product_ref: ProductRef::Catalog(product.id.clone()),
            product_code: product.product_code.clone(),
            name: product.name.clone(),
            hsn_code: product.hsn_code.clone().unwrap_or_default(),
            barcode: product.barcode.clone().unwrap_or_default(),
            mrp: product.mrp,
            unit_price: product.selling_price(),
            quantity: 1,
            cgst_pct: TaxRate::or_default_to(product.cgst_pct, TaxRate::DEFAULT_COMPONENT),
            sgst_pct: TaxRate::or_default_to(product.sgst_pct, TaxRate::DEFAULT_COMPONENT),
            unit: product
                .unit
                .clone()
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| DEFAULT_UNIT.to_string()),
            current_stock: product.current_stock,
            min_stock: product.min_stock,
            line_total: Money::zero(),
            taxable_amount: Money::zero(),
            cgst_amount: Money::zero(),
            sgst_amount: Money::zero(),
        };
        line.recalculate();
        line
    }

    /// Unpriced ad-hoc line.
    pub fn quick(name: String) -> Self {
        CartLineItem {
            product_ref: ProductRef::new_quick(),
            product_code: String::new(),
            name,
            hsn_code: String::new(),
            barcode: String::new(),
            mrp: Money::zero(),
            unit_price: Money::zero(),
            quantity: 1,
            cgst_pct: TaxRate::DEFAULT_COMPONENT,
            sgst_pct: TaxRate::DEFAULT_COMPONENT,
            unit: DEFAULT_UNIT.to_string(),
            current_stock: 0,
            min_stock: 0,
            line_total: Money::zero(),
            taxable_amount: Money::zero(),
            cgst_amount: Money::zero(),
            sgst_amount: Money::zero(),
        }
    }

    /// Rebuilds a line from a persisted invoice line.
    ///
    /// Stored amounts are ignored and recomputed from price, quantity and
    /// rates. `product` supplies the live stock badge when still in the
    /// catalog.
    pub fn from_invoice_line(item: &InvoiceLineItem, product: Option<&Product>) -> Self {
        let product_ref = match &item.product {
            Some(id) => ProductRef::Catalog(id.clone()),
            None => ProductRef::new_quick(),
        };
        let mut line = CartLineItem {
            product_ref,
            product_code: item.product_code.clone(),
            name: item.product_name.clone(),
            hsn_code: item.hsn_code.clone(),
            barcode: item.barcode.clone(),
            mrp: item.mrp,
            unit_price: item.unit_price,
            quantity: item.quantity.clamp(1, MAX_LINE_QUANTITY),
            cgst_pct: TaxRate::or_default_to(Some(item.cgst_pct), TaxRate::DEFAULT_COMPONENT),
            sgst_pct: TaxRate::or_default_to(Some(item.sgst_pct), TaxRate::DEFAULT_COMPONENT),
            unit: if item.unit.is_empty() {
                DEFAULT_UNIT.to_string()
            } else {
                item.unit.clone()
            },
            current_stock: product.map(|p| p.current_stock).unwrap_or(0),
            min_stock: product.map(|p| p.min_stock).unwrap_or(0),
            line_total: Money::zero(),
            taxable_amount: Money::zero(),
            cgst_amount: Money::zero(),
            sgst_amount: Money::zero(),
        };
        line.recalculate();
        line
    }

    /// Recomputes `line_total` and the tax split from price and quantity.
    pub fn recalculate(&mut self) {
        let gross = self.unit_price * self.quantity;
        let split = extract_tax(gross, self.cgst_pct, self.sgst_pct);
        self.line_total = gross;
        self.taxable_amount = split.taxable;
        self.cgst_amount = split.cgst;
        self.sgst_amount = split.sgst;
    }

    /// Line has no usable price.
    pub fn is_unpriced(&self) -> bool {
        !self.unit_price.is_positive()
    }

    /// True when this is an ad-hoc line.
    pub fn is_quick(&self) -> bool {
        matches!(self.product_ref, ProductRef::Quick(_))
    }

    /// Number from a `"Saree - N"` name.
    fn quick_number(&self) -> Option<u64> {
        self.name.strip_prefix(QUICK_LINE_PREFIX)?.parse().ok()
    }
}

// =============================================================================
// Checkout Flow
// =============================================================================

/// Screen the checkout flow is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep {
    #[default]
    Products,
    Customer,
    Review,
}

/// The invoice being revised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditingInvoice {
    pub id: String,
    pub invoice_number: String,
}

// =============================================================================
// Cart
// =============================================================================

/// The cart and its checkout flow state.
///
/// ## Invariants
/// - One line per catalog product (re-adding increments quantity)
/// - Quantity is at least 1 on every line
/// - `0 <= discount <= subtotal`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartLineItem>,

    /// Bound customer record, if resolved.
    #[serde(default)]
    pub customer: Option<Customer>,

    #[serde(default)]
    pub customer_mobile: String,

    #[serde(default)]
    pub customer_name: String,

    #[serde(default)]
    discount: Money,

    #[serde(default)]
    pub payment_method: PaymentMethod,

    #[serde(default)]
    pub step: CheckoutStep,

    #[serde(default)]
    editing: Option<EditingInvoice>,
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Cart::default()
    }

    // -------------------------------------------------------------------------
    // Line mutations
    // -------------------------------------------------------------------------

    /// Adds one unit of `product`. Returns the position of the line.
    pub fn add_item(&mut self, product: &Product) -> usize {
        let existing = self
            .items
            .iter()
            .position(|i| i.product_ref.catalog_id() == Some(product.id.as_str()));

        let index = match existing {
            Some(index) => {
                let line = &mut self.items[index];
                line.quantity = (line.quantity + 1).min(MAX_LINE_QUANTITY);
                line.recalculate();
                index
            }
            None => {
                self.items.push(CartLineItem::from_product(product));
                self.items.len() - 1
            }
        };
        self.reclamp_discount();
        index
    }

    /// Appends `count` unpriced quick lines, numbered after the highest
    /// existing `"Saree - N"` line.
    pub fn add_quick_lines(&mut self, count: u32) {
        let start = self
            .items
            .iter()
            .filter_map(CartLineItem::quick_number)
            .max()
            .unwrap_or(0);
        for n in 1..=u64::from(count) {
            let number = start.saturating_add(n);
            self.items
                .push(CartLineItem::quick(format!("{}{}", QUICK_LINE_PREFIX, number)));
        }
    }

    /// Removes the line at `index`.
    pub fn remove_item(&mut self, index: usize) -> CoreResult<CartLineItem> {
        self.check_index(index)?;
        let removed = self.items.remove(index);
        self.reclamp_discount();
        Ok(removed)
    }

    /// Sets a line's quantity, clamped to `1..=MAX_LINE_QUANTITY`.
    pub fn update_quantity(&mut self, index: usize, quantity: i64) -> CoreResult<()> {
        self.check_index(index)?;
        let line = &mut self.items[index];
        line.quantity = quantity.clamp(1, MAX_LINE_QUANTITY);
        line.recalculate();
        self.reclamp_discount();
        Ok(())
    }

    /// Overwrites a line's unit price. Negative prices become zero.
    pub fn update_price(&mut self, index: usize, price: Money) -> CoreResult<()> {
        self.check_index(index)?;
        let line = &mut self.items[index];
        line.unit_price = price.max(Money::zero());
        line.recalculate();
        self.reclamp_discount();
        Ok(())
    }

    /// Renames a line (quick lines are named by hand).
    pub fn rename_item(&mut self, index: usize, name: impl Into<String>) -> CoreResult<()> {
        self.check_index(index)?;
        self.items[index].name = name.into();
        Ok(())
    }

    fn check_index(&self, index: usize) -> CoreResult<()> {
        if index >= self.items.len() {
            return Err(CoreError::LineOutOfRange {
                index,
                len: self.items.len(),
            });
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Discount
    // -------------------------------------------------------------------------

    /// One step down toward the next clean hundred.
    pub fn discount_up(&mut self) -> Money {
        self.discount = next_discount(self.subtotal(), self.discount);
        self.discount
    }

    /// One step back.
    pub fn discount_down(&mut self) -> Money {
        self.discount = prev_discount(self.subtotal(), self.discount);
        self.discount
    }

    /// Sets the discount, clamped into `[0, subtotal]`.
    pub fn set_discount(&mut self, amount: Money) -> Money {
        self.discount = clamp_discount(amount, self.subtotal());
        self.discount
    }

    fn reclamp_discount(&mut self) {
        self.discount = clamp_discount(self.discount, self.subtotal());
    }

    // -------------------------------------------------------------------------
    // Derived totals
    // -------------------------------------------------------------------------

    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    pub fn discount(&self) -> Money {
        self.discount
    }

    pub fn subtotal(&self) -> Money {
        self.items.iter().map(|i| i.line_total).sum()
    }

    pub fn taxable_total(&self) -> Money {
        self.items.iter().map(|i| i.taxable_amount).sum()
    }

    pub fn cgst_total(&self) -> Money {
        self.items.iter().map(|i| i.cgst_amount).sum()
    }

    pub fn sgst_total(&self) -> Money {
        self.items.iter().map(|i| i.sgst_amount).sum()
    }

    pub fn grand_total(&self) -> Money {
        self.subtotal() - self.discount
    }

    /// Total units across all lines.
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Lines still at ₹0.
    pub fn unpriced_count(&self) -> usize {
        self.items.iter().filter(|i| i.is_unpriced()).count()
    }

    /// Blocks finalize on an empty cart or unpriced lines.
    pub fn validate_for_finalize(&self) -> CoreResult<()> {
        if self.items.is_empty() {
            return Err(CoreError::EmptyCart);
        }
        match self.unpriced_count() {
            0 => Ok(()),
            count => Err(CoreError::MissingPrice { count }),
        }
    }

    // -------------------------------------------------------------------------
    // Editing
    // -------------------------------------------------------------------------

    pub fn editing(&self) -> Option<&EditingInvoice> {
        self.editing.as_ref()
    }

    pub fn is_editing(&self) -> bool {
        self.editing.is_some()
    }

    /// Replaces the cart with a persisted invoice for revision.
    ///
    /// `products` supplies live stock figures for lines still in the
    /// catalog. A superseded (`revised`) invoice cannot be edited.
    pub fn load_for_edit(
        &mut self,
        invoice: &Invoice,
        customer: Option<Customer>,
        lines: &[InvoiceLineItem],
        products: &[Product],
    ) -> CoreResult<()> {
        if invoice.status == InvoiceStatus::Revised {
            return Err(CoreError::InvalidInvoiceStatus {
                invoice_number: invoice.invoice_number.clone(),
                status: invoice.status.to_string(),
                operation: "edit".to_string(),
            });
        }

        self.items = lines
            .iter()
            .map(|line| {
                let product = line
                    .product
                    .as_deref()
                    .and_then(|id| products.iter().find(|p| p.id == id));
                CartLineItem::from_invoice_line(line, product)
            })
            .collect();
        self.customer_mobile = customer.as_ref().map(|c| c.mobile.clone()).unwrap_or_default();
        self.customer_name = customer.as_ref().map(|c| c.name.clone()).unwrap_or_default();
        self.customer = customer;
        self.payment_method = invoice.payment_method;
        self.discount = Money::zero();
        self.set_discount(invoice.discount_total);
        self.step = CheckoutStep::Products;
        self.editing = Some(EditingInvoice {
            id: invoice.id.clone(),
            invoice_number: invoice.invoice_number.clone(),
        });
        Ok(())
    }

    /// Empties the cart and leaves edit mode.
    ///
    /// With `keep_customer` the customer binding and payment method stay
    /// for the next bill.
    pub fn clear(&mut self, keep_customer: bool) {
        self.items.clear();
        self.discount = Money::zero();
        self.step = CheckoutStep::Products;
        self.editing = None;
        if !keep_customer {
            self.customer = None;
            self.customer_mobile.clear();
            self.customer_name.clear();
            self.payment_method = PaymentMethod::default();
        }
    }

    // -------------------------------------------------------------------------
    // Snapshot
    // -------------------------------------------------------------------------

    /// Serializes the cart for session persistence.
    pub fn to_snapshot(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Restores a snapshot, recomputing every line and the discount clamp.
    pub fn from_snapshot(snapshot: &str) -> Result<Cart, serde_json::Error> {
        let mut cart: Cart = serde_json::from_str(snapshot)?;
        for line in &mut cart.items {
            line.quantity = line.quantity.clamp(1, MAX_LINE_QUANTITY);
            line.recalculate();
        }
        cart.reclamp_discount();
        Ok(cart)
    }
}

/// Cart totals summary for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartTotals {
    pub line_count: usize,
    pub item_count: i64,
    pub subtotal: Money,
    pub taxable_total: Money,
    pub cgst_total: Money,
    pub sgst_total: Money,
    pub discount: Money,
    pub grand_total: Money,
    pub unpriced_count: usize,
}

impl From<&Cart> for CartTotals {
    fn from(cart: &Cart) -> Self {
        CartTotals {
            line_count: cart.items.len(),
            item_count: cart.item_count(),
            subtotal: cart.subtotal(),
            taxable_total: cart.taxable_total(),
            cgst_total: cart.cgst_total(),
            sgst_total: cart.sgst_total(),
            discount: cart.discount,
            grand_total: cart.grand_total(),
            unpriced_count: cart.unpriced_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(id: &str, retail: i64) -> Product {
        Product {
            id: id.to_string(),
            product_code: format!("P-{}", id),
            name: format!("Saree {}", id),
            description: None,
            hsn_code: Some("5208".to_string()),
            purchase_price: None,
            retail_price: Money::from_rupees(retail),
            mrp: Money::from_rupees(retail),
            wholesale_price: None,
            cgst_pct: None,
            sgst_pct: None,
            unit: None,
            barcode: None,
            min_stock: 2,
            current_stock: 10,
            active: true,
        }
    }

    #[test]
    fn test_add_same_product_twice_merges() {
        let mut cart = Cart::new();
        let p = product("1", 1500);

        assert_eq!(cart.add_item(&p), 0);
        assert_eq!(cart.add_item(&p), 0);

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 2);
        assert_eq!(cart.subtotal(), Money::from_rupees(3000));
        assert_eq!(cart.item_count(), 2);
    }

    #[test]
    fn test_add_item_defaults() {
        let mut cart = Cart::new();
        let mut p = product("1", 0);
        p.mrp = Money::from_rupees(800);
        cart.add_item(&p);

        let line = &cart.items()[0];
        assert_eq!(line.unit_price, Money::from_rupees(800));
        assert_eq!(line.cgst_pct, TaxRate::DEFAULT_COMPONENT);
        assert_eq!(line.unit, "PCS");
    }

    #[test]
    fn test_line_tax_follows_extraction() {
        let mut cart = Cart::new();
        cart.add_item(&product("1", 500));
        let line = &cart.items()[0];
        assert_eq!(line.taxable_amount, Money::from_paise(47_619));
        assert_eq!(line.cgst_amount, Money::from_paise(1_190));
        assert_eq!(cart.sgst_total(), Money::from_paise(1_190));
    }

    #[test]
    fn test_update_quantity_floors_at_one() {
        let mut cart = Cart::new();
        cart.add_item(&product("1", 100));
        cart.update_quantity(0, 0).unwrap();
        assert_eq!(cart.items()[0].quantity, 1);
        cart.update_quantity(0, -4).unwrap();
        assert_eq!(cart.items()[0].quantity, 1);
        cart.update_quantity(0, 3).unwrap();
        assert_eq!(cart.subtotal(), Money::from_rupees(300));
    }

    #[test]
    fn test_huge_quantity_is_capped() {
        let mut cart = Cart::new();
        cart.add_item(&product("1", 100));
        cart.update_quantity(0, i64::MAX).unwrap();
        assert_eq!(cart.items()[0].quantity, MAX_LINE_QUANTITY);
        assert_eq!(cart.subtotal(), Money::from_rupees(100 * MAX_LINE_QUANTITY));

        cart.add_item(&product("1", 100));
        assert_eq!(cart.items()[0].quantity, MAX_LINE_QUANTITY);
    }

    #[test]
    fn test_quick_lines_after_huge_number() {
        let mut cart = Cart::new();
        cart.add_quick_lines(1);
        cart.rename_item(0, format!("{}{}", QUICK_LINE_PREFIX, u32::MAX)).unwrap();
        cart.add_quick_lines(2);
        assert_eq!(cart.items()[1].name, format!("{}{}", QUICK_LINE_PREFIX, u64::from(u32::MAX) + 1));
        assert_eq!(cart.items()[2].name, format!("{}{}", QUICK_LINE_PREFIX, u64::from(u32::MAX) + 2));
    }

    #[test]
    fn test_out_of_range_index() {
        let mut cart = Cart::new();
        assert!(matches!(
            cart.update_price(2, Money::from_rupees(5)),
            Err(CoreError::LineOutOfRange { index: 2, len: 0 })
        ));
        assert!(cart.remove_item(0).is_err());
    }

    #[test]
    fn test_set_discount_clamps() {
        let mut cart = Cart::new();
        cart.add_item(&product("1", 300));
        assert_eq!(cart.set_discount(Money::from_rupees(-10)), Money::zero());
        assert_eq!(cart.set_discount(Money::from_rupees(1000)), Money::from_rupees(300));
        assert_eq!(cart.grand_total(), Money::zero());
    }

    #[test]
    fn test_discount_reclamped_when_subtotal_drops() {
        let mut cart = Cart::new();
        cart.add_item(&product("1", 300));
        cart.add_item(&product("2", 200));
        cart.set_discount(Money::from_rupees(400));
        cart.remove_item(0).unwrap();
        assert_eq!(cart.discount(), Money::from_rupees(200));
    }

    #[test]
    fn test_discount_buttons() {
        let mut cart = Cart::new();
        let p = product("1", 1500);
        cart.add_item(&p);
        cart.add_item(&p);
        assert_eq!(cart.discount_up(), Money::from_rupees(25));
        assert_eq!(cart.grand_total(), Money::from_rupees(2975));
        assert_eq!(cart.discount_down(), Money::zero());
    }

    #[test]
    fn test_quick_lines_continue_numbering() {
        let mut cart = Cart::new();
        cart.add_quick_lines(3);
        cart.remove_item(1).unwrap();
        cart.add_quick_lines(2);

        let names: Vec<&str> = cart.items().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Saree - 1", "Saree - 3", "Saree - 4", "Saree - 5"]);
        assert!(cart.items().iter().all(CartLineItem::is_quick));
        assert_eq!(cart.unpriced_count(), 4);
    }

    #[test]
    fn test_validate_for_finalize() {
        let mut cart = Cart::new();
        assert!(matches!(cart.validate_for_finalize(), Err(CoreError::EmptyCart)));

        cart.add_item(&product("1", 100));
        cart.add_quick_lines(2);
        let err = cart.validate_for_finalize().unwrap_err();
        assert_eq!(err.to_string(), "2 item(s) missing price");

        cart.update_price(1, Money::from_rupees(50)).unwrap();
        cart.update_price(2, Money::from_rupees(50)).unwrap();
        assert!(cart.validate_for_finalize().is_ok());
    }

    fn stored_invoice(status: InvoiceStatus) -> Invoice {
        Invoice {
            id: "inv1".to_string(),
            invoice_number: "GST-0007-2025/26".to_string(),
            invoice_date: Utc::now(),
            customer: "c1".to_string(),
            tax_type: "GST".to_string(),
            subtotal: Money::from_rupees(1000),
            discount_total: Money::from_rupees(25),
            cgst_total: Money::zero(),
            sgst_total: Money::zero(),
            grand_total: Money::from_rupees(975),
            amount_paid: Money::from_rupees(975),
            payment_method: PaymentMethod::Upi,
            status,
            adjustment: Money::zero(),
            notes: None,
            created_by: None,
        }
    }

    fn stored_line(product: Option<&str>, price: i64, qty: i64) -> InvoiceLineItem {
        InvoiceLineItem {
            id: String::new(),
            invoice: "inv1".to_string(),
            product: product.map(str::to_string),
            product_name: "Saree".to_string(),
            product_code: String::new(),
            hsn_code: String::new(),
            barcode: String::new(),
            quantity: qty,
            unit: "PCS".to_string(),
            unit_price: Money::from_rupees(price),
            mrp: Money::zero(),
            // Deliberately stale amounts
            taxable_amount: Money::from_rupees(1),
            cgst_pct: TaxRate::from_bps(250),
            cgst_amount: Money::from_rupees(1),
            sgst_pct: TaxRate::from_bps(250),
            sgst_amount: Money::from_rupees(1),
            total: Money::from_rupees(1),
        }
    }

    #[test]
    fn test_load_for_edit_recomputes_lines() {
        let mut cart = Cart::new();
        let customer = Customer {
            id: "c1".to_string(),
            name: "Asha".to_string(),
            mobile: "9876543210".to_string(),
            email: None,
            address: None,
            city: None,
            state: None,
            gstin: None,
            notes: None,
        };
        let lines = vec![stored_line(Some("p1"), 500, 1), stored_line(None, 500, 1)];
        cart.load_for_edit(
            &stored_invoice(InvoiceStatus::Completed),
            Some(customer),
            &lines,
            &[product("p1", 500)],
        )
        .unwrap();

        assert!(cart.is_editing());
        assert_eq!(cart.editing().unwrap().invoice_number, "GST-0007-2025/26");
        assert_eq!(cart.customer_mobile, "9876543210");
        assert_eq!(cart.payment_method, PaymentMethod::Upi);
        assert_eq!(cart.discount(), Money::from_rupees(25));
        assert_eq!(cart.items()[0].taxable_amount, Money::from_paise(47_619));
        assert_eq!(cart.items()[0].current_stock, 10);
        assert!(cart.items()[1].is_quick());
    }

    #[test]
    fn test_load_for_edit_rejects_revised() {
        let mut cart = Cart::new();
        let result = cart.load_for_edit(&stored_invoice(InvoiceStatus::Revised), None, &[], &[]);
        assert!(matches!(result, Err(CoreError::InvalidInvoiceStatus { .. })));
        assert!(!cart.is_editing());
    }

    #[test]
    fn test_clear_keeps_customer_on_request() {
        let mut cart = Cart::new();
        cart.add_item(&product("1", 100));
        cart.customer_mobile = "9876543210".to_string();
        cart.payment_method = PaymentMethod::Card;
        cart.step = CheckoutStep::Review;

        cart.clear(true);
        assert!(cart.is_empty());
        assert_eq!(cart.step, CheckoutStep::Products);
        assert_eq!(cart.customer_mobile, "9876543210");
        assert_eq!(cart.payment_method, PaymentMethod::Card);

        cart.clear(false);
        assert!(cart.customer_mobile.is_empty());
        assert_eq!(cart.payment_method, PaymentMethod::Cash);
    }

    #[test]
    fn test_snapshot_restores_and_recomputes() {
        let mut cart = Cart::new();
        cart.add_item(&product("1", 1500));
        cart.set_discount(Money::from_rupees(100));
        cart.step = CheckoutStep::Customer;

        let snapshot = cart.to_snapshot().unwrap();
        let restored = Cart::from_snapshot(&snapshot).unwrap();
        assert_eq!(restored, cart);
        assert_eq!(CartTotals::from(&restored).grand_total, Money::from_rupees(1400));
    }
}
