//! # Error Types
//!
//! Domain-specific error types for bookstore-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  bookstore-core errors (this file)                                     │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  bookstore-db errors (separate crate)                                  │
//! │  └── DbError          - Storage failures (wraps CoreError)             │
//! │                                                                         │
//! │  storefront errors (app)                                               │
//! │  └── ApiError         - What callers see (code + message)              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Caller       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::types::OrderStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The caller presented no session, or the session is unknown or expired.
    #[error("Please log in first")]
    NotAuthenticated,

    /// Username/password pair did not match a user.
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Book not found: {0}")]
    BookNotFound(i64),

    #[error("Cart item not found: {0}")]
    CartItemNotFound(i64),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Checkout was attempted without a cart, or with a cart that has no lines.
    #[error("Cart for user {user_id} is empty")]
    EmptyCart { user_id: i64 },

    /// Checkout would drive a book's stock below zero.
    ///
    /// ## User Workflow
    /// ```text
    /// Cart: "Dune" x 5
    ///      │
    ///      ▼
    /// Checkout: stock for "Dune" = 3
    ///      │
    ///      ▼
    /// InsufficientStock { title: "Dune", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Whole checkout rolled back, cart untouched
    /// ```
    #[error("Insufficient stock for '{title}': available {available}, requested {requested}")]
    InsufficientStock {
        book_id: i64,
        title: String,
        available: i64,
        requested: i64,
    },

    /// Order status change attempted out of sequence.
    ///
    /// ## When This Occurs
    /// - Shipping an order that is already shipped or received
    /// - Receiving an order that has not been shipped
    /// - Receiving an order twice
    #[error("Order {order_id} is {from}, cannot move to {to}")]
    InvalidTransition {
        order_id: String,
        from: OrderStatus,
        to: OrderStatus,
    },

    /// Acting user does not own the order.
    #[error("Order {order_id} does not belong to the current user")]
    NotOrderOwner { order_id: String },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors, raised at the boundary before any write.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
