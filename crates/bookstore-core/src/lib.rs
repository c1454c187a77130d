//! # bookstore-core: Pure Business Logic for the Bookstore
//!
//! This crate holds the rules of the bookstore as pure functions with zero
//! I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Bookstore Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Storefront Commands                          │   │
//! │  │    add_to_cart, checkout, ship_order, receive_order, etc.      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ bookstore-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   cart    │  │   order   │  │   │
//! │  │   │   Book    │  │   Money   │  │  totals   │  │  build +  │  │   │
//! │  │   │   Order   │  │           │  │  views    │  │  status   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 bookstore-db (Database Layer)                   │   │
//! │  │        SQLite queries, migrations, checkout transaction         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (Book, User, Session, Cart, Order, ...)
//! - [`money`] - Money type with integer arithmetic
//! - [`cart`] - Cart aggregation and views
//! - [`order`] - Order construction and the status state machine
//! - [`error`] - Domain error types
//! - [`validation`] - Boundary validation
//!
//! ## Example Usage
//!
//! ```rust
//! use bookstore_core::{OrderStatus, Money};
//!
//! let price = Money::from_cents(1000);
//! assert_eq!(price.multiply_quantity(2).to_string(), "$20.00");
//!
//! assert!(OrderStatus::Placed.ensure_transition("o-1", OrderStatus::Shipped).is_ok());
//! assert!(OrderStatus::Placed.ensure_transition("o-1", OrderStatus::Received).is_err());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod money;
pub mod order;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{CartAddition, CartLineView, CartTotals, CartView};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use order::{build_order, NewOrderItem, PlacedOrder};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity of a single cart line.
///
/// Guards against typing 1000 instead of 10.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Highest price a book may carry, in cents ($100,000.00).
///
/// Keeps line amounts and order totals far inside `i64`.
pub const MAX_PRICE_CENTS: i64 = 10_000_000;

/// Books shown per catalog page.
pub const BOOKS_PAGE_SIZE: i64 = 4;
