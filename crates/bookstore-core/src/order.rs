//! # Orders
//!
//! Order construction from a cart and the order status state machine.
//!
//! ## Checkout (pure half)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │   Cart + live Books                                                     │
//! │        │                                                                │
//! │        ▼                                                                │
//! │   build_order() ← THIS MODULE                                           │
//! │        ├── no lines?            → EmptyCart                             │
//! │        ├── book gone?           → BookNotFound                          │
//! │        ├── stock < quantity?    → InsufficientStock                     │
//! │        └── OK → PlacedOrder { order (Placed), frozen lines }            │
//! │        │                                                                │
//! │        ▼                                                                │
//! │   bookstore-db writes it inside one transaction                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Book, Cart, Order, OrderStatus};

// =============================================================================
// Status State Machine
// =============================================================================

impl OrderStatus {
    /// The only state that may precede `self`, if any.
    pub fn predecessor(&self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Placed => None,
            OrderStatus::Shipped => Some(OrderStatus::Placed),
            OrderStatus::Received => Some(OrderStatus::Shipped),
        }
    }

    /// Checks that `self → to` is a single forward step.
    pub fn ensure_transition(&self, order_id: &str, to: OrderStatus) -> CoreResult<()> {
        if to.predecessor() == Some(*self) {
            Ok(())
        } else {
            Err(CoreError::InvalidTransition {
                order_id: order_id.to_string(),
                from: *self,
                to,
            })
        }
    }
}

// =============================================================================
// Order Construction
// =============================================================================

/// A frozen order line before it has been assigned a row id.
///
/// `book_id` is kept only to drive the stock/sales update at checkout; it is
/// not persisted on the order line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub book_id: i64,
    pub title: String,
    pub author: String,
    pub price_cents: i64,
    pub image_path: String,
    pub quantity: i64,
    pub amount_cents: i64,
}

/// An order ready to be written, with its frozen lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedOrder {
    pub order: Order,
    pub items: Vec<NewOrderItem>,
}

/// Builds the order a checkout of `cart` would produce.
///
/// The line price is the price captured on the cart line, so the order
/// totals equal the cart totals exactly. Title, author and image are copied
/// from the live book at this instant.
pub fn build_order(
    cart: &Cart,
    books: &HashMap<i64, Book>,
    order_id: String,
    now: DateTime<Utc>,
) -> CoreResult<PlacedOrder> {
    if cart.is_empty() {
        return Err(CoreError::EmptyCart {
            user_id: cart.user_id,
        });
    }

    let mut items = Vec::with_capacity(cart.items.len());
    for line in &cart.items {
        let book = books
            .get(&line.book_id)
            .ok_or(CoreError::BookNotFound(line.book_id))?;

        if !book.can_sell(line.quantity) {
            return Err(CoreError::InsufficientStock {
                book_id: book.id,
                title: book.title.clone(),
                available: book.stock,
                requested: line.quantity,
            });
        }

        items.push(NewOrderItem {
            book_id: book.id,
            title: book.title.clone(),
            author: book.author.clone(),
            price_cents: line.unit_price_cents,
            image_path: book.image_path.clone(),
            quantity: line.quantity,
            amount_cents: line.line_amount().cents(),
        });
    }

    let total_amount: Money = items
        .iter()
        .map(|i| Money::from_cents(i.amount_cents))
        .sum();

    Ok(PlacedOrder {
        order: Order {
            id: order_id,
            user_id: cart.user_id,
            created_at: now,
            total_count: cart.total_count(),
            total_amount_cents: total_amount.cents(),
            status: OrderStatus::Placed,
        },
        items,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::tests::{cart_with, line};

    fn book(id: i64, title: &str, price_cents: i64, stock: i64) -> Book {
        Book {
            id,
            title: title.to_string(),
            author: "Author".to_string(),
            price_cents,
            stock,
            sales: 0,
            image_path: format!("/static/img/{id}.jpg"),
        }
    }

    fn catalog(books: Vec<Book>) -> HashMap<i64, Book> {
        books.into_iter().map(|b| (b.id, b)).collect()
    }

    #[test]
    fn test_forward_transitions() {
        assert!(OrderStatus::Placed
            .ensure_transition("o-1", OrderStatus::Shipped)
            .is_ok());
        assert!(OrderStatus::Shipped
            .ensure_transition("o-1", OrderStatus::Received)
            .is_ok());
        assert_eq!(OrderStatus::Placed.predecessor(), None);
    }

    #[test]
    fn test_ensure_transition_rejects_skips_and_reversals() {
        assert!(OrderStatus::Placed
            .ensure_transition("o", OrderStatus::Shipped)
            .is_ok());
        assert!(OrderStatus::Shipped
            .ensure_transition("o", OrderStatus::Received)
            .is_ok());

        // Receive before ship
        let err = OrderStatus::Placed
            .ensure_transition("o", OrderStatus::Received)
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidTransition {
                from: OrderStatus::Placed,
                to: OrderStatus::Received,
                ..
            }
        ));

        // Repeat receive, reverse, and re-place
        assert!(OrderStatus::Received
            .ensure_transition("o", OrderStatus::Received)
            .is_err());
        assert!(OrderStatus::Received
            .ensure_transition("o", OrderStatus::Shipped)
            .is_err());
        assert!(OrderStatus::Shipped
            .ensure_transition("o", OrderStatus::Placed)
            .is_err());
    }

    #[test]
    fn test_build_order_freezes_totals_and_lines() {
        let cart = cart_with(vec![line(1, 10, 1000, 2), line(2, 20, 2000, 1)]);
        let books = catalog(vec![book(10, "A", 1000, 5), book(20, "B", 2000, 5)]);
        let now = Utc::now();

        let placed = build_order(&cart, &books, "order-1".to_string(), now).unwrap();

        assert_eq!(placed.order.id, "order-1");
        assert_eq!(placed.order.user_id, 1);
        assert_eq!(placed.order.status, OrderStatus::Placed);
        assert_eq!(placed.order.total_count, 3);
        assert_eq!(placed.order.total_amount_cents, 4000);
        assert_eq!(placed.order.created_at, now);

        assert_eq!(placed.items.len(), 2);
        assert_eq!(placed.items[0].title, "A");
        assert_eq!(placed.items[0].amount_cents, 2000);
        assert_eq!(placed.items[1].image_path, "/static/img/20.jpg");
    }

    #[test]
    fn test_build_order_uses_captured_price() {
        let cart = cart_with(vec![line(1, 10, 1000, 2)]);
        // Catalog price rose after the book went into the cart
        let books = catalog(vec![book(10, "A", 1500, 5)]);

        let placed = build_order(&cart, &books, "o".to_string(), Utc::now()).unwrap();
        assert_eq!(placed.items[0].price_cents, 1000);
        assert_eq!(placed.order.total_amount_cents, cart.total_amount().cents());
    }

    #[test]
    fn test_build_order_rejects_empty_cart() {
        let cart = cart_with(vec![]);
        let err = build_order(&cart, &HashMap::new(), "o".to_string(), Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::EmptyCart { user_id: 1 }));
    }

    #[test]
    fn test_build_order_rejects_missing_book() {
        let cart = cart_with(vec![line(1, 10, 1000, 1)]);
        let err = build_order(&cart, &HashMap::new(), "o".to_string(), Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::BookNotFound(10)));
    }

    #[test]
    fn test_build_order_rejects_insufficient_stock() {
        let cart = cart_with(vec![line(1, 10, 1000, 5)]);
        let books = catalog(vec![book(10, "Dune", 1000, 3)]);

        let err = build_order(&cart, &books, "o".to_string(), Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientStock {
                available: 3,
                requested: 5,
                ..
            }
        ));
    }
}
