//! # Cart State
//!
//! The session's cart, shared between UI handlers and persisted as a
//! JSON snapshot so it survives navigation and restarts.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart State Operations                                │
//! │                                                                         │
//! │  UI Action               CartState                Snapshot file         │
//! │  ─────────               ─────────                ─────────────         │
//! │                                                                         │
//! │  Scan barcode ──────────► update(add_item) ─────► written               │
//! │                                                                         │
//! │  Change price ──────────► update(update_price) ─► written               │
//! │                                                                         │
//! │  Show totals ───────────► with_cart(totals) ────► (read only)           │
//! │                                                                         │
//! │  App start ─────────────► restore() ◄──────────── read                  │
//! │                                                                         │
//! │  Bill saved ────────────► clear(keep_customer) ─► written               │
//! │                                                                         │
//! │  Logout ────────────────► clear_all() ──────────► deleted               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `with_cart_mut` changes the cart without writing the snapshot; use
//! `update` (or call `persist` afterwards) for changes that must survive.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

use dukaan_core::{Cart, CartTotals};

use crate::error::CheckoutResult;

/// Session cart state.
///
/// A poisoned lock is recovered rather than propagated: the cart is
/// plain data and every mutation keeps its invariants before returning.
#[derive(Debug, Clone, Default)]
pub struct CartState {
    cart: Arc<Mutex<Cart>>,
    snapshot_path: Option<PathBuf>,
}

impl CartState {
    /// A cart kept in memory only.
    pub fn new() -> Self {
        Self::default()
    }

    /// A cart persisted to `path` after every `update`.
    pub fn persistent(path: impl Into<PathBuf>) -> Self {
        CartState {
            cart: Arc::new(Mutex::new(Cart::new())),
            snapshot_path: Some(path.into()),
        }
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }

    fn lock(&self) -> MutexGuard<'_, Cart> {
        self.cart.lock().unwrap_or_else(|poisoned| {
            warn!("Cart mutex poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Executes a function with read access to the cart.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let totals = cart_state.with_cart(CartTotals::from);
    /// ```
    pub fn with_cart<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Cart) -> R,
    {
        let cart = self.lock();
        f(&cart)
    }

    /// Executes a function with write access to the cart. The snapshot
    /// is not written.
    pub fn with_cart_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Cart) -> R,
    {
        let mut cart = self.lock();
        f(&mut cart)
    }

    /// Mutates the cart and writes the snapshot.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// cart_state.update(|cart| cart.update_price(0, Money::from_rupees(1500)))??;
    /// ```
    pub fn update<F, R>(&self, f: F) -> CheckoutResult<R>
    where
        F: FnOnce(&mut Cart) -> R,
    {
        let mut cart = self.lock();
        let result = f(&mut cart);
        self.write_snapshot(&cart)?;
        Ok(result)
    }

    /// Copy of the current cart.
    pub fn snapshot(&self) -> Cart {
        self.with_cart(Cart::clone)
    }

    pub fn totals(&self) -> CartTotals {
        self.with_cart(|cart| CartTotals::from(cart))
    }

    /// Writes the current cart to the snapshot file.
    pub fn persist(&self) -> CheckoutResult<()> {
        let cart = self.lock();
        self.write_snapshot(&cart)
    }

    /// Replaces the cart with the persisted snapshot, if one exists.
    /// Returns whether a snapshot was loaded.
    pub fn restore(&self) -> CheckoutResult<bool> {
        let Some(path) = &self.snapshot_path else {
            return Ok(false);
        };
        if !path.exists() {
            debug!(?path, "No cart snapshot to restore");
            return Ok(false);
        }
        let contents = std::fs::read_to_string(path)?;
        let restored = Cart::from_snapshot(&contents)?;
        debug!(?path, lines = restored.items().len(), "Cart restored");
        *self.lock() = restored;
        Ok(true)
    }

    /// Empties the cart and leaves edit mode.
    pub fn clear(&self, keep_customer: bool) -> CheckoutResult<()> {
        self.update(|cart| cart.clear(keep_customer))
    }

    /// Resets everything and deletes the snapshot file.
    pub fn clear_all(&self) -> CheckoutResult<()> {
        *self.lock() = Cart::new();
        if let Some(path) = &self.snapshot_path {
            match std::fs::remove_file(path) {
                Ok(()) => debug!(?path, "Cart snapshot deleted"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn write_snapshot(&self, cart: &Cart) -> CheckoutResult<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, cart.to_snapshot()?)?;
        Ok(())
    }
}
