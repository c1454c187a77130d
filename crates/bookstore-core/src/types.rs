//! # Domain Types
//!
//! Records persisted by the bookstore and the views built from them.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐                   │
//! │  │    Book     │   │    User     │   │   Session   │                   │
//! │  │  id (int)   │   │  id (int)   │   │  id (uuid)  │                   │
//! │  │  price      │   │  username   │   │  user_id    │                   │
//! │  │  stock      │   │  email      │   │  expires_at │                   │
//! │  │  sales      │   └─────────────┘   └─────────────┘                   │
//! │  └──────┬──────┘                                                       │
//! │         │ price captured at add time                                    │
//! │         ▼                                                               │
//! │  ┌─────────────┐   checkout    ┌─────────────┐                         │
//! │  │ Cart (uuid) │ ────────────► │ Order (uuid)│                         │
//! │  │  CartItem*  │               │  OrderItem* │ ← frozen snapshots      │
//! │  └─────────────┘               │  status     │                         │
//! │                                └─────────────┘                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Cart behaviour lives in [`crate::cart`], order construction and the status
//! state machine in [`crate::order`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::money::Money;

// =============================================================================
// Book
// =============================================================================

/// A book in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    /// Price in cents.
    pub price_cents: i64,
    pub stock: i64,
    /// Units sold. Only checkout increments it.
    pub sales: i64,
    pub image_path: String,
}

impl Book {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks if `quantity` units can be taken from stock.
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.stock >= quantity
    }
}

/// Fields needed to create or overwrite a book; the id is assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub price_cents: i64,
    pub stock: i64,
    pub sales: i64,
    pub image_path: String,
}

// =============================================================================
// Accounts
// =============================================================================

/// A registered user. `password_hash` is an Argon2 PHC string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub email: String,
}

/// A login session. The id is the opaque token handed to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Session {
    pub id: String,
    pub user_id: i64,
    pub username: String,
    pub created_at: DateTime<Utc>,
    /// `None` means the session lives until logout.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

// =============================================================================
// Cart
// =============================================================================

/// One line within a cart.
///
/// `unit_price_cents` is captured from the book when the line is first
/// created and is never re-read from the catalog afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CartItem {
    pub id: i64,
    pub cart_id: String,
    pub book_id: i64,
    pub unit_price_cents: i64,
    pub quantity: i64,
    pub added_at: DateTime<Utc>,
}

/// A user's mutable cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Cart {
    pub id: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Loaded separately from `cart_items`, in insertion order.
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub items: Vec<CartItem>,
}

// =============================================================================
// Orders
// =============================================================================

/// Order lifecycle: `Placed → Shipped → Received`.
///
/// Stored as an integer (0, 1, 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[repr(i32)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Placed = 0,
    Shipped = 1,
    /// Terminal.
    Received = 2,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Placed => "placed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Received => "received",
        }
    }

    /// Integer code used in the `orders.status` column.
    pub const fn code(&self) -> i32 {
        *self as i32
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An order created from a cart at checkout. Totals are never recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Order {
    pub id: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub total_count: i64,
    pub total_amount_cents: i64,
    pub status: OrderStatus,
}

impl Order {
    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }
}

/// A frozen line of an order. Uses snapshot pattern: no reference to the
/// live book row, so catalog edits never alter order history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: i64,
    pub order_id: String,
    pub title: String,
    pub author: String,
    pub price_cents: i64,
    pub image_path: String,
    pub quantity: i64,
    /// price × quantity at checkout.
    pub amount_cents: i64,
}

/// An order together with its frozen lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

// =============================================================================
// Paging
// =============================================================================

/// One page of a listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    /// 1-based page number.
    pub page_no: i64,
    pub page_size: i64,
    pub total_records: i64,
    pub total_pages: i64,
    pub records: Vec<T>,
}

impl<T> Page<T> {
    /// Builds a page, deriving `total_pages` from the record count.
    pub fn new(page_no: i64, page_size: i64, total_records: i64, records: Vec<T>) -> Self {
        let total_pages = if total_records == 0 {
            0
        } else {
            (total_records + page_size - 1) / page_size
        };
        Page {
            page_no,
            page_size,
            total_records,
            total_pages,
            records,
        }
    }

    pub fn has_prev(&self) -> bool {
        self.page_no > 1
    }

    pub fn has_next(&self) -> bool {
        self.page_no < self.total_pages
    }

    /// Zero-based row offset of the first record on `page_no`.
    ///
    /// Saturates, so an absurd page number just lands past the last row.
    pub fn offset(page_no: i64, page_size: i64) -> i64 {
        (page_no.max(1) - 1).saturating_mul(page_size)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
