//! # Order Repository
//!
//! Checkout and the order status lifecycle.
//!
//! ## Checkout Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │   1. UPDATE carts … WHERE user_id = ? RETURNING   ← claims the cart     │
//! │        └── no row? → EmptyCart (a concurrent checkout got there first) │
//! │   2. load lines + their books                                           │
//! │   3. build_order()  (pure: empty / missing book / stock checks)         │
//! │   4. INSERT orders, INSERT order_items (frozen snapshots)               │
//! │   5. UPDATE books SET stock -= q, sales += q WHERE stock >= q           │
//! │   6. DELETE carts (lines cascade)                                       │
//! │  COMMIT            any error above → ROLLBACK, nothing persists         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Status Lifecycle
//! ```text
//! Placed(0) ──ship──► Shipped(1) ──receive──► Received(2)
//! ```
//! Transitions are a single conditional `UPDATE … WHERE status = <previous>`,
//! so two racing ships cannot both succeed.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::DbResult;
use crate::repository::book::{fetch_book, sell_copies};
use crate::repository::cart::fetch_items;
use bookstore_core::{
    build_order, Cart, CoreError, Order, OrderDetail, OrderItem, OrderStatus,
};

const ORDER_COLUMNS: &str = "id, user_id, created_at, total_count, total_amount_cents, status";
const ORDER_ITEM_COLUMNS: &str =
    "id, order_id, title, author, price_cents, image_path, quantity, amount_cents";

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Converts the user's cart into an order.
    ///
    /// ## Errors
    /// * `CoreError::EmptyCart` - no cart, or a cart without lines
    /// * `CoreError::BookNotFound` - a line's book was deleted
    /// * `CoreError::InsufficientStock` - a line asks for more than is left
    ///
    /// On any error the transaction is rolled back: no order, no stock
    /// change, cart untouched.
    pub async fn checkout(&self, user_id: i64) -> DbResult<OrderDetail> {
        debug!(user_id, "Starting checkout");

        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        // Write first so the lock is held from here to COMMIT
        let cart = sqlx::query_as::<_, Cart>(
            r#"
            UPDATE carts SET updated_at = ?1
            WHERE user_id = ?2
            RETURNING id, user_id, created_at, updated_at
            "#,
        )
        .bind(now)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(mut cart) = cart else {
            return Err(CoreError::EmptyCart { user_id }.into());
        };
        cart.items = fetch_items(&mut *tx, &cart.id).await?;

        let mut books = HashMap::with_capacity(cart.items.len());
        for item in &cart.items {
            if let Some(book) = fetch_book(&mut *tx, item.book_id).await? {
                books.insert(book.id, book);
            }
        }

        let placed = build_order(&cart, &books, Uuid::new_v4().to_string(), now)?;
        let order = &placed.order;

        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, created_at, total_count, total_amount_cents, status)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&order.id)
        .bind(order.user_id)
        .bind(order.created_at)
        .bind(order.total_count)
        .bind(order.total_amount_cents)
        .bind(order.status)
        .execute(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(placed.items.len());
        for line in &placed.items {
            let item = sqlx::query_as::<_, OrderItem>(&format!(
                r#"
                INSERT INTO order_items
                    (order_id, title, author, price_cents, image_path, quantity, amount_cents)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                RETURNING {ORDER_ITEM_COLUMNS}
                "#
            ))
            .bind(&order.id)
            .bind(&line.title)
            .bind(&line.author)
            .bind(line.price_cents)
            .bind(&line.image_path)
            .bind(line.quantity)
            .bind(line.amount_cents)
            .fetch_one(&mut *tx)
            .await?;
            items.push(item);

            if !sell_copies(&mut *tx, line.book_id, line.quantity).await? {
                // Checked by build_order under the same lock; only reachable
                // if the row changed underneath us
                let available = fetch_book(&mut *tx, line.book_id)
                    .await?
                    .map(|b| b.stock)
                    .ok_or(CoreError::BookNotFound(line.book_id))?;
                return Err(CoreError::InsufficientStock {
                    book_id: line.book_id,
                    title: line.title.clone(),
                    available,
                    requested: line.quantity,
                }
                .into());
            }
        }

        sqlx::query("DELETE FROM carts WHERE id = ?1")
            .bind(&cart.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(
            order_id = %order.id,
            user_id,
            total_count = order.total_count,
            total_amount = %order.total_amount(),
            "Order placed"
        );

        Ok(OrderDetail {
            order: placed.order,
            items,
        })
    }

    /// Moves a `Placed` order to `Shipped`.
    ///
    /// ## Errors
    /// * `CoreError::OrderNotFound`
    /// * `CoreError::InvalidTransition` - the order is not `Placed`
    pub async fn ship(&self, order_id: &str) -> DbResult<Order> {
        self.transition(order_id, OrderStatus::Shipped, None).await
    }

    /// Moves a `Shipped` order to `Received` on behalf of its owner.
    ///
    /// ## Errors
    /// * `CoreError::OrderNotFound`
    /// * `CoreError::NotOrderOwner` - `user_id` does not own the order
    /// * `CoreError::InvalidTransition` - the order is not `Shipped`
    pub async fn receive(&self, order_id: &str, user_id: i64) -> DbResult<Order> {
        self.transition(order_id, OrderStatus::Received, Some(user_id))
            .await
    }

    async fn transition(
        &self,
        order_id: &str,
        to: OrderStatus,
        owner: Option<i64>,
    ) -> DbResult<Order> {
        debug!(order_id, to = %to, "Changing order status");

        let Some(current) = self.get_by_id(order_id).await? else {
            return Err(CoreError::OrderNotFound(order_id.to_string()).into());
        };

        if let Some(user_id) = owner {
            if current.user_id != user_id {
                warn!(order_id, user_id, "Status change by non-owner rejected");
                return Err(CoreError::NotOrderOwner {
                    order_id: order_id.to_string(),
                }
                .into());
            }
        }

        if let Err(e) = current.status.ensure_transition(order_id, to) {
            warn!(order_id, from = %current.status, to = %to, "Invalid status transition");
            return Err(e.into());
        }

        let Some(from) = to.predecessor() else {
            return Err(CoreError::InvalidTransition {
                order_id: order_id.to_string(),
                from: current.status,
                to,
            }
            .into());
        };

        let updated = sqlx::query_as::<_, Order>(&format!(
            "UPDATE orders SET status = ?1 WHERE id = ?2 AND status = ?3 RETURNING {ORDER_COLUMNS}"
        ))
        .bind(to)
        .bind(order_id)
        .bind(from)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(order) => {
                info!(order_id, status = %order.status, "Order status changed");
                Ok(order)
            }
            None => {
                // Lost a race: someone else moved it since we looked
                let status = self
                    .get_by_id(order_id)
                    .await?
                    .map(|o| o.status)
                    .ok_or_else(|| CoreError::OrderNotFound(order_id.to_string()))?;
                warn!(order_id, from = %status, to = %to, "Invalid status transition");
                Err(CoreError::InvalidTransition {
                    order_id: order_id.to_string(),
                    from: status,
                    to,
                }
                .into())
            }
        }
    }

    pub async fn get_by_id(&self, order_id: &str) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    /// Frozen lines of an order, in checkout order.
    pub async fn get_items(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        fetch_order_items(&self.pool, order_id).await
    }

    /// An order with its lines, or `None` when the id is unknown.
    pub async fn get_detail(&self, order_id: &str) -> DbResult<Option<OrderDetail>> {
        let Some(order) = self.get_by_id(order_id).await? else {
            return Ok(None);
        };
        let items = self.get_items(order_id).await?;
        Ok(Some(OrderDetail { order, items }))
    }

    /// Every order, newest first (administrative view).
    pub async fn list_all(&self) -> DbResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, rowid DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// Orders owned by one user, newest first.
    pub async fn list_for_user(&self, user_id: i64) -> DbResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }
}

async fn fetch_order_items<'e, E>(executor: E, order_id: &str) -> DbResult<Vec<OrderItem>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let items = sqlx::query_as::<_, OrderItem>(&format!(
        "SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE order_id = ?1 ORDER BY id"
    ))
    .bind(order_id)
    .fetch_all(executor)
    .await?;

    Ok(items)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::book::tests::new_book;
    use crate::repository::cart::tests::setup;
    use crate::{Database, DbConfig, DbError};
    use bookstore_core::Book;

    /// Cart: A 2 × $10.00, B 1 × $20.00
    async fn cart_of_two(db: &Database, user_id: i64) -> (Book, Book) {
        let a = db.books().insert(&new_book("A", 1000, 10)).await.unwrap();
        let b = db.books().insert(&new_book("B", 2000, 5)).await.unwrap();
        db.carts().add_item(user_id, a.id, 2).await.unwrap();
        db.carts().add_item(user_id, b.id, 1).await.unwrap();
        (a, b)
    }

    #[tokio::test]
    async fn test_checkout_preserves_totals_and_moves_stock() {
        let (db, user_id) = setup().await;
        let (a, b) = cart_of_two(&db, user_id).await;

        let detail = db.orders().checkout(user_id).await.unwrap();
        assert_eq!(detail.order.total_amount_cents, 4000);
        assert_eq!(detail.order.total_count, 3);
        assert_eq!(detail.order.status, OrderStatus::Placed);
        assert_eq!(detail.items.len(), 2);
        assert_eq!(detail.items[0].title, "A");
        assert_eq!(detail.items[0].amount_cents, 2000);

        let a_after = db.books().get_by_id(a.id).await.unwrap().unwrap();
        let b_after = db.books().get_by_id(b.id).await.unwrap().unwrap();
        assert_eq!((a_after.stock, a_after.sales), (8, 2));
        assert_eq!((b_after.stock, b_after.sales), (4, 1));

        // Cart is gone
        assert!(db.carts().get_by_user(user_id).await.unwrap().is_none());

        // Persisted detail matches what checkout returned
        let stored = db.orders().get_detail(&detail.order.id).await.unwrap().unwrap();
        assert_eq!(stored, detail);
    }

    #[tokio::test]
    async fn test_order_history_survives_catalog_edits() {
        let (db, user_id) = setup().await;
        let (a, _) = cart_of_two(&db, user_id).await;
        let detail = db.orders().checkout(user_id).await.unwrap();

        db.books()
            .update(a.id, &new_book("A, Revised", 9900, 8))
            .await
            .unwrap();

        let items = db.orders().get_items(&detail.order.id).await.unwrap();
        assert_eq!(items[0].title, "A");
        assert_eq!(items[0].price_cents, 1000);
    }

    #[tokio::test]
    async fn test_checkout_without_cart_is_rejected() {
        let (db, user_id) = setup().await;

        let err = db.orders().checkout(user_id).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::EmptyCart { .. })));

        // A cart with no lines is empty too
        db.carts().get_or_create(user_id).await.unwrap();
        let err = db.orders().checkout(user_id).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::EmptyCart { .. })));
        assert!(db.orders().list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insufficient_stock_rolls_back_everything() {
        let (db, user_id) = setup().await;
        let (a, b) = cart_of_two(&db, user_id).await;
        // Someone else bought most of B
        assert!(db.books().update_stock_and_sales(b.id, 5).await.unwrap());

        let err = db.orders().checkout(user_id).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::InsufficientStock { available: 0, requested: 1, .. })
        ));

        // A's stock untouched, no order, cart intact
        let a_after = db.books().get_by_id(a.id).await.unwrap().unwrap();
        assert_eq!((a_after.stock, a_after.sales), (10, 0));
        assert!(db.orders().list_for_user(user_id).await.unwrap().is_empty());
        let cart = db.carts().get_by_user(user_id).await.unwrap().unwrap();
        assert_eq!(cart.total_count(), 3);
    }

    #[tokio::test]
    async fn test_ship_then_receive() {
        let (db, user_id) = setup().await;
        cart_of_two(&db, user_id).await;
        let order_id = db.orders().checkout(user_id).await.unwrap().order.id;

        let shipped = db.orders().ship(&order_id).await.unwrap();
        assert_eq!(shipped.status, OrderStatus::Shipped);

        let received = db.orders().receive(&order_id, user_id).await.unwrap();
        assert_eq!(received.status, OrderStatus::Received);

        // Repeating receive is rejected and never reverts
        let err = db.orders().receive(&order_id, user_id).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::InvalidTransition { .. })));
        let err = db.orders().ship(&order_id).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::InvalidTransition { .. })));

        let order = db.orders().get_by_id(&order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Received);
    }

    #[tokio::test]
    async fn test_receive_before_ship_is_rejected() {
        let (db, user_id) = setup().await;
        cart_of_two(&db, user_id).await;
        let order_id = db.orders().checkout(user_id).await.unwrap().order.id;

        let err = db.orders().receive(&order_id, user_id).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::InvalidTransition {
                from: OrderStatus::Placed,
                to: OrderStatus::Received,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_receive_by_non_owner_is_rejected() {
        let (db, user_id) = setup().await;
        let bob = db.users().insert("bob", "hash", "bob@x.com").await.unwrap();
        cart_of_two(&db, user_id).await;
        let order_id = db.orders().checkout(user_id).await.unwrap().order.id;
        db.orders().ship(&order_id).await.unwrap();

        let err = db.orders().receive(&order_id, bob.id).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::NotOrderOwner { .. })));
    }

    #[tokio::test]
    async fn test_unknown_order_is_not_found() {
        let (db, user_id) = setup().await;

        assert!(db.orders().get_detail("nope").await.unwrap().is_none());
        let err = db.orders().ship("nope").await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::OrderNotFound(_))));
        let err = db.orders().receive("nope", user_id).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::OrderNotFound(_))));
    }

    #[tokio::test]
    async fn test_listing_is_owner_scoped() {
        let (db, alice) = setup().await;
        let bob = db.users().insert("bob", "hash", "bob@x.com").await.unwrap().id;
        let book = db.books().insert(&new_book("A", 1000, 10)).await.unwrap();

        db.carts().add_item(alice, book.id, 1).await.unwrap();
        db.orders().checkout(alice).await.unwrap();
        db.carts().add_item(bob, book.id, 1).await.unwrap();
        db.orders().checkout(bob).await.unwrap();
        db.carts().add_item(alice, book.id, 1).await.unwrap();
        db.orders().checkout(alice).await.unwrap();

        assert_eq!(db.orders().list_all().await.unwrap().len(), 3);
        let mine = db.orders().list_for_user(alice).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|o| o.user_id == alice));
    }

    #[tokio::test]
    async fn test_concurrent_checkouts_of_one_cart_place_one_order() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("orders.db")).max_connections(4))
            .await
            .unwrap();
        let user = db.users().insert("alice", "hash", "alice@x.com").await.unwrap();
        let book = db.books().insert(&new_book("A", 1000, 10)).await.unwrap();
        db.carts().add_item(user.id, book.id, 2).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let orders = db.orders();
            let user_id = user.id;
            handles.push(tokio::spawn(async move { orders.checkout(user_id).await }));
        }

        let mut placed = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => placed += 1,
                Err(DbError::Core(CoreError::EmptyCart { .. })) => {}
                Err(other) => panic!("unexpected checkout error: {other}"),
            }
        }

        assert_eq!(placed, 1);
        let after = db.books().get_by_id(book.id).await.unwrap().unwrap();
        assert_eq!((after.stock, after.sales), (8, 2));
    }

    #[tokio::test]
    async fn test_concurrent_buyers_never_oversell() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("stock.db")).max_connections(4))
            .await
            .unwrap();
        let book = db.books().insert(&new_book("Last Copies", 1000, 3)).await.unwrap();

        let mut buyers = Vec::new();
        for i in 0..5 {
            let user = db
                .users()
                .insert(&format!("buyer{i}"), "hash", &format!("buyer{i}@x.com"))
                .await
                .unwrap();
            db.carts().add_item(user.id, book.id, 1).await.unwrap();
            buyers.push(user.id);
        }

        let mut handles = Vec::new();
        for user_id in buyers {
            let orders = db.orders();
            handles.push(tokio::spawn(async move { orders.checkout(user_id).await }));
        }

        let mut placed = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => placed += 1,
                Err(DbError::Core(CoreError::InsufficientStock { .. })) => {}
                Err(other) => panic!("unexpected checkout error: {other}"),
            }
        }

        assert_eq!(placed, 3);
        let after = db.books().get_by_id(book.id).await.unwrap().unwrap();
        assert_eq!((after.stock, after.sales), (0, 3));
    }
}
