//! # Cart Aggregation
//!
//! Pure functions over a loaded [`Cart`]. Totals are recomputed from the
//! current lines on every call; nothing is cached.
//!
//! ## Price Freezing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Book.price_cents ──(add time)──► CartItem.unit_price_cents             │
//! │                                          │                              │
//! │  later catalog price change              │  line = unit × qty           │
//! │  does NOT reach the cart                 ▼                              │
//! │                                   Cart totals = Σ lines                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::{Book, Cart, CartItem};

impl CartItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Line amount: captured unit price × quantity.
    #[inline]
    pub fn line_amount(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }
}

impl Cart {
    /// Σ quantity over all lines.
    pub fn total_count(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Σ (quantity × captured unit price) over all lines.
    pub fn total_amount(&self) -> Money {
        self.items.iter().map(CartItem::line_amount).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn totals(&self) -> CartTotals {
        CartTotals::from(self)
    }
}

/// Cart totals summary for responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CartTotals {
    pub line_count: usize,
    pub total_count: i64,
    pub total_amount_cents: i64,
}

impl From<&Cart> for CartTotals {
    fn from(cart: &Cart) -> Self {
        CartTotals {
            line_count: cart.items.len(),
            total_count: cart.total_count(),
            total_amount_cents: cart.total_amount().cents(),
        }
    }
}

/// A cart line joined with the live catalog entry, for display.
///
/// `book` is `None` when the book has since been removed from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLineView {
    pub item: CartItem,
    pub book: Option<Book>,
    pub line_amount_cents: i64,
}

/// The outcome of adding a book: the stored line and the book as it was read
/// under the same transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartAddition {
    pub item: CartItem,
    pub book: Book,
}

/// Everything a cart page shows: the lines and their totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartView {
    /// `None` when the user has never added anything.
    pub cart_id: Option<String>,
    pub lines: Vec<CartLineView>,
    pub totals: CartTotals,
}

impl CartView {
    pub fn empty() -> Self {
        CartView {
            cart_id: None,
            lines: Vec::new(),
            totals: CartTotals::default(),
        }
    }

    /// Joins each cart line with its book from `lookup`.
    pub fn build<F>(cart: &Cart, mut lookup: F) -> Self
    where
        F: FnMut(i64) -> Option<Book>,
    {
        let lines = cart
            .items
            .iter()
            .map(|item| CartLineView {
                book: lookup(item.book_id),
                line_amount_cents: item.line_amount().cents(),
                item: item.clone(),
            })
            .collect();

        CartView {
            cart_id: Some(cart.id.clone()),
            lines,
            totals: cart.totals(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
