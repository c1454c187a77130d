//! # Cart Repository
//!
//! One cart per user, one line per (cart, book).
//!
//! ## Add To Cart
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │   1. upsert carts(user_id)          ← first statement writes: takes    │
//! │                                        the lock, checkout can't slip in │
//! │   2. read the book                  ← BookNotFound, price to capture    │
//! │   3. INSERT cart_items VALUES (…)                                       │
//! │      ON CONFLICT(cart_id, book_id)                                      │
//! │      DO UPDATE SET quantity = quantity + excluded.quantity              │
//! │        │                                                                │
//! │        ├── new line: unit price captured from the book row              │
//! │        └── existing line: quantity incremented, price left alone        │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Two concurrent adds of the same book both land in the single line.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::book::fetch_book;
use bookstore_core::{
    Cart, CartAddition, CartItem, CartView, CoreError, ValidationError, MAX_ITEM_QUANTITY,
};

const CART_COLUMNS: &str = "id, user_id, created_at, updated_at";
const ITEM_COLUMNS: &str = "id, cart_id, book_id, unit_price_cents, quantity, added_at";

/// Repository for cart database operations.
#[derive(Debug, Clone)]
pub struct CartRepository {
    pool: SqlitePool,
}

impl CartRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CartRepository { pool }
    }

    /// Returns the user's cart, allocating an empty one if there is none.
    pub async fn get_or_create(&self, user_id: i64) -> DbResult<Cart> {
        let mut cart = upsert_cart(&self.pool, user_id).await?;
        cart.items = fetch_items(&self.pool, &cart.id).await?;
        Ok(cart)
    }

    /// Returns the user's cart with its lines, if one exists.
    pub async fn get_by_user(&self, user_id: i64) -> DbResult<Option<Cart>> {
        let cart = sqlx::query_as::<_, Cart>(&format!(
            "SELECT {CART_COLUMNS} FROM carts WHERE user_id = ?1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match cart {
            Some(mut cart) => {
                cart.items = fetch_items(&self.pool, &cart.id).await?;
                Ok(Some(cart))
            }
            None => Ok(None),
        }
    }

    /// Adds `quantity` copies of a book to the user's cart.
    ///
    /// Returns the stored line together with the book as read inside the
    /// same transaction.
    ///
    /// ## Errors
    /// * `CoreError::BookNotFound` - no such book
    /// * `ValidationError::OutOfRange` - the line would exceed `MAX_ITEM_QUANTITY`
    pub async fn add_item(
        &self,
        user_id: i64,
        book_id: i64,
        quantity: i64,
    ) -> DbResult<CartAddition> {
        debug!(user_id, book_id, quantity, "Adding to cart");

        let mut tx = self.pool.begin().await?;
        let cart = upsert_cart(&mut *tx, user_id).await?;

        let Some(book) = fetch_book(&mut *tx, book_id).await? else {
            return Err(CoreError::BookNotFound(book_id).into());
        };

        let item = sqlx::query_as::<_, CartItem>(&format!(
            r#"
            INSERT INTO cart_items (cart_id, book_id, unit_price_cents, quantity, added_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (cart_id, book_id)
            DO UPDATE SET quantity = cart_items.quantity + excluded.quantity
            WHERE cart_items.quantity + excluded.quantity <= ?6
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(&cart.id)
        .bind(book.id)
        .bind(book.price_cents)
        .bind(quantity)
        .bind(Utc::now())
        .bind(MAX_ITEM_QUANTITY)
        .fetch_optional(&mut *tx)
        .await?;

        // No row back: the conflict update was refused, the line is full
        let Some(item) = item else {
            return Err(CoreError::from(ValidationError::OutOfRange {
                field: "quantity".to_string(),
                min: 1,
                max: MAX_ITEM_QUANTITY,
            })
            .into());
        };

        tx.commit().await?;

        debug!(item_id = item.id, quantity = item.quantity, "Cart line stored");
        Ok(CartAddition { item, book })
    }

    pub async fn get_item(&self, item_id: i64) -> DbResult<Option<CartItem>> {
        let item = sqlx::query_as::<_, CartItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM cart_items WHERE id = ?1"
        ))
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Overwrites a line's quantity. Range checks happen at the boundary.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - no such line
    pub async fn update_item_quantity(&self, item_id: i64, quantity: i64) -> DbResult<CartItem> {
        debug!(item_id, quantity, "Updating cart line quantity");

        let item = sqlx::query_as::<_, CartItem>(&format!(
            "UPDATE cart_items SET quantity = ?2 WHERE id = ?1 RETURNING {ITEM_COLUMNS}"
        ))
        .bind(item_id)
        .bind(quantity)
        .fetch_optional(&self.pool)
        .await?;

        item.ok_or_else(|| DbError::not_found("CartItem", item_id.to_string()))
    }

    /// Removes a line. Returns `false` when there was no such line.
    pub async fn remove_item(&self, item_id: i64) -> DbResult<bool> {
        debug!(item_id, "Removing cart line");

        let result = sqlx::query("DELETE FROM cart_items WHERE id = ?1")
            .bind(item_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes the cart row; its lines cascade. Returns `false` when absent.
    pub async fn clear(&self, cart_id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM carts WHERE id = ?1")
            .bind(cart_id)
            .execute(&self.pool)
            .await?;

        let cleared = result.rows_affected() > 0;
        if cleared {
            info!(cart_id, "Cart cleared");
        }
        Ok(cleared)
    }

    /// The cart page: lines joined with live books, plus totals.
    ///
    /// A user without a cart gets an empty view; nothing is created.
    pub async fn view(&self, user_id: i64) -> DbResult<CartView> {
        let Some(cart) = self.get_by_user(user_id).await? else {
            return Ok(CartView::empty());
        };

        let mut books = HashMap::with_capacity(cart.items.len());
        for item in &cart.items {
            if let Some(book) = fetch_book(&self.pool, item.book_id).await? {
                books.insert(book.id, book);
            }
        }

        Ok(CartView::build(&cart, |id| books.get(&id).cloned()))
    }
}

// =============================================================================
// Shared statements
// =============================================================================

/// Inserts the user's cart or touches `updated_at` on the existing one.
pub(crate) async fn upsert_cart<'e, E>(executor: E, user_id: i64) -> DbResult<Cart>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = Utc::now();

    let cart = sqlx::query_as::<_, Cart>(&format!(
        r#"
        INSERT INTO carts (id, user_id, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?3)
        ON CONFLICT (user_id) DO UPDATE SET updated_at = excluded.updated_at
        RETURNING {CART_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(now)
    .fetch_one(executor)
    .await?;

    Ok(cart)
}

/// Lines of a cart in the order they were first added.
pub(crate) async fn fetch_items<'e, E>(executor: E, cart_id: &str) -> DbResult<Vec<CartItem>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let items = sqlx::query_as::<_, CartItem>(&format!(
        "SELECT {ITEM_COLUMNS} FROM cart_items WHERE cart_id = ?1 ORDER BY id"
    ))
    .bind(cart_id)
    .fetch_all(executor)
    .await?;

    Ok(items)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::repository::book::tests::new_book;
    use crate::{Database, DbConfig};

    pub(crate) async fn setup() -> (Database, i64) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let user = db.users().insert("alice", "hash", "alice@x.com").await.unwrap();
        (db, user.id)
    }

    #[tokio::test]
    async fn test_get_or_create_is_stable() {
        let (db, user_id) = setup().await;
        assert!(db.carts().get_by_user(user_id).await.unwrap().is_none());

        let first = db.carts().get_or_create(user_id).await.unwrap();
        let second = db.carts().get_or_create(user_id).await.unwrap();
        assert_eq!(first.id, second.id);
        assert!(second.items.is_empty());
    }

    #[tokio::test]
    async fn test_repeat_add_increments_single_line() {
        let (db, user_id) = setup().await;
        let book = db.books().insert(&new_book("Dune", 1000, 10)).await.unwrap();

        db.carts().add_item(user_id, book.id, 1).await.unwrap();
        let added = db.carts().add_item(user_id, book.id, 2).await.unwrap();
        assert_eq!(added.item.quantity, 3);
        assert_eq!(added.book.title, "Dune");

        let cart = db.carts().get_by_user(user_id).await.unwrap().unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.total_count(), 3);
    }

    #[tokio::test]
    async fn test_price_is_captured_at_add_time() {
        let (db, user_id) = setup().await;
        let book = db.books().insert(&new_book("Dune", 1000, 10)).await.unwrap();
        db.carts().add_item(user_id, book.id, 2).await.unwrap();

        // Catalog price changes afterwards
        db.books()
            .update(book.id, &new_book("Dune", 5000, 10))
            .await
            .unwrap();
        let added = db.carts().add_item(user_id, book.id, 1).await.unwrap();
        assert_eq!(added.item.unit_price_cents, 1000);
        // The returned book is the live row
        assert_eq!(added.book.price_cents, 5000);

        let cart = db.carts().get_by_user(user_id).await.unwrap().unwrap();
        assert_eq!(cart.total_amount().cents(), 3000);
    }

    #[tokio::test]
    async fn test_add_unknown_book() {
        let (db, user_id) = setup().await;
        let err = db.carts().add_item(user_id, 42, 1).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::BookNotFound(42))));
        // Rolled back with the cart upsert
        assert!(db.carts().get_by_user(user_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_add_past_line_limit_is_rejected() {
        let (db, user_id) = setup().await;
        let book = db.books().insert(&new_book("Dune", 1000, 10)).await.unwrap();
        db.carts().add_item(user_id, book.id, 999).await.unwrap();

        let err = db.carts().add_item(user_id, book.id, 1).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));

        let cart = db.carts().get_by_user(user_id).await.unwrap().unwrap();
        assert_eq!(cart.items[0].quantity, 999);
    }

    #[tokio::test]
    async fn test_add_returns_book_read_with_line() {
        let (db, user_id) = setup().await;
        let book = db.books().insert(&new_book("Dune", 1250, 10)).await.unwrap();

        let added = db.carts().add_item(user_id, book.id, 2).await.unwrap();
        assert_eq!(added.book, book);
        assert_eq!(added.item.book_id, book.id);
        assert_eq!(added.item.unit_price_cents, 1250);
        assert_eq!(added.item.quantity, 2);
    }

    #[tokio::test]
    async fn test_update_and_remove_lines() {
        let (db, user_id) = setup().await;
        let book = db.books().insert(&new_book("Dune", 1000, 10)).await.unwrap();
        let item = db.carts().add_item(user_id, book.id, 1).await.unwrap().item;

        let updated = db.carts().update_item_quantity(item.id, 5).await.unwrap();
        assert_eq!(updated.quantity, 5);

        let missing = db.carts().update_item_quantity(9999, 5).await;
        assert!(matches!(missing, Err(DbError::NotFound { .. })));

        assert!(db.carts().remove_item(item.id).await.unwrap());
        // Second removal reports zero rows, not an error
        assert!(!db.carts().remove_item(item.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_removes_cart_and_lines() {
        let (db, user_id) = setup().await;
        let book = db.books().insert(&new_book("Dune", 1000, 10)).await.unwrap();
        let item = db.carts().add_item(user_id, book.id, 1).await.unwrap().item;

        assert!(db.carts().clear(&item.cart_id).await.unwrap());
        assert!(db.carts().get_by_user(user_id).await.unwrap().is_none());
        assert!(db.carts().get_item(item.id).await.unwrap().is_none());
        assert!(!db.carts().clear(&item.cart_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_view_totals() {
        let (db, user_id) = setup().await;
        assert!(db.carts().view(user_id).await.unwrap().cart_id.is_none());

        let a = db.books().insert(&new_book("A", 1000, 10)).await.unwrap();
        let b = db.books().insert(&new_book("B", 2000, 10)).await.unwrap();
        db.carts().add_item(user_id, a.id, 2).await.unwrap();
        db.carts().add_item(user_id, b.id, 1).await.unwrap();

        let view = db.carts().view(user_id).await.unwrap();
        assert_eq!(view.lines.len(), 2);
        assert_eq!(view.totals.total_count, 3);
        assert_eq!(view.totals.total_amount_cents, 4000);
        assert_eq!(view.lines[1].book.as_ref().map(|b| b.title.as_str()), Some("B"));
    }

    #[tokio::test]
    async fn test_concurrent_adds_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("cart.db")).max_connections(4))
            .await
            .unwrap();
        let user = db.users().insert("alice", "hash", "alice@x.com").await.unwrap();
        let book = db.books().insert(&new_book("Dune", 1000, 100)).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let carts = db.carts();
            let (user_id, book_id) = (user.id, book.id);
            handles.push(tokio::spawn(async move {
                carts.add_item(user_id, book_id, 1).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let cart = db.carts().get_by_user(user.id).await.unwrap().unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 10);
    }
}
