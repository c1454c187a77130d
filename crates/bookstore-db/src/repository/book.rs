//! # Book Repository
//!
//! Database operations for the catalog.
//!
//! ## Key Operations
//! - CRUD operations
//! - Paged listing (4 per page), optionally filtered by price
//! - Conditional stock/sales update used by checkout
//!
//! ## Stock Update
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UPDATE books                                                           │
//! │     SET stock = stock - q, sales = sales + q                            │
//! │   WHERE id = ? AND stock >= q                                           │
//! │                                                                         │
//! │  One statement: no read-modify-write window. Two buyers of the last    │
//! │  copy serialize on the write lock; the second sees 0 rows affected.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use bookstore_core::validation::validate_new_book;
use bookstore_core::{Book, CoreError, NewBook, Page, BOOKS_PAGE_SIZE};

const BOOK_COLUMNS: &str = "id, title, author, price_cents, stock, sales, image_path";

/// Repository for catalog database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = BookRepository::new(pool);
///
/// let page = repo.page(1).await?;
/// let book = repo.get_by_id(7).await?;
/// ```
#[derive(Debug, Clone)]
pub struct BookRepository {
    pool: SqlitePool,
}

impl BookRepository {
    /// Creates a new BookRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BookRepository { pool }
    }

    /// Inserts a book and returns it with its assigned id.
    ///
    /// ## Errors
    /// `DbError::Core` with a validation error for a blank title or author,
    /// or a price, stock or sales figure out of range. Nothing is written.
    pub async fn insert(&self, book: &NewBook) -> DbResult<Book> {
        validate_new_book(book).map_err(CoreError::from)?;
        debug!(title = %book.title, price_cents = book.price_cents, "Inserting book");

        let inserted = sqlx::query_as::<_, Book>(&format!(
            r#"
            INSERT INTO books (title, author, price_cents, stock, sales, image_path)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            RETURNING {BOOK_COLUMNS}
            "#
        ))
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.price_cents)
        .bind(book.stock)
        .bind(book.sales)
        .bind(&book.image_path)
        .fetch_one(&self.pool)
        .await?;

        Ok(inserted)
    }

    /// Gets a book by ID.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Book>> {
        fetch_book(&self.pool, id).await
    }

    /// Lists the whole catalog by id.
    pub async fn list(&self) -> DbResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    /// Overwrites every field of a book. Validated like [`Self::insert`].
    pub async fn update(&self, id: i64, book: &NewBook) -> DbResult<Book> {
        validate_new_book(book).map_err(CoreError::from)?;
        debug!(id, title = %book.title, "Updating book");

        let updated = sqlx::query_as::<_, Book>(&format!(
            r#"
            UPDATE books SET
                title = ?2,
                author = ?3,
                price_cents = ?4,
                stock = ?5,
                sales = ?6,
                image_path = ?7
            WHERE id = ?1
            RETURNING {BOOK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.price_cents)
        .bind(book.stock)
        .bind(book.sales)
        .bind(&book.image_path)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| DbError::not_found("Book", id.to_string()))
    }

    /// Deletes a book. Cart lines referencing it go with it; order history
    /// keeps its snapshots.
    ///
    /// Returns `false` when no such book existed.
    pub async fn delete(&self, id: i64) -> DbResult<bool> {
        debug!(id, "Deleting book");

        let result = sqlx::query("DELETE FROM books WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Takes `quantity` copies out of stock and counts them as sold.
    ///
    /// ## Returns
    /// * `Ok(true)` - stock and sales moved together
    /// * `Ok(false)` - book missing or fewer than `quantity` in stock; nothing changed
    pub async fn update_stock_and_sales(&self, id: i64, quantity: i64) -> DbResult<bool> {
        sell_copies(&self.pool, id, quantity).await
    }

    /// Counts all books.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// One page of the catalog, `BOOKS_PAGE_SIZE` per page.
    ///
    /// Page numbers below 1 are treated as 1. A page past the end comes back
    /// with no records.
    pub async fn page(&self, page_no: i64) -> DbResult<Page<Book>> {
        let page_no = page_no.max(1);
        debug!(page_no, "Fetching catalog page");

        let total = self.count().await?;
        let records = sqlx::query_as::<_, Book>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books ORDER BY id LIMIT ?1 OFFSET ?2"
        ))
        .bind(BOOKS_PAGE_SIZE)
        .bind(Page::<Book>::offset(page_no, BOOKS_PAGE_SIZE))
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(page_no, BOOKS_PAGE_SIZE, total, records))
    }

    /// One page of books priced within `[min_cents, max_cents]`.
    pub async fn page_by_price(
        &self,
        page_no: i64,
        min_cents: i64,
        max_cents: i64,
    ) -> DbResult<Page<Book>> {
        let page_no = page_no.max(1);
        debug!(page_no, min_cents, max_cents, "Fetching catalog page by price");

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM books WHERE price_cents BETWEEN ?1 AND ?2")
                .bind(min_cents)
                .bind(max_cents)
                .fetch_one(&self.pool)
                .await?;

        let records = sqlx::query_as::<_, Book>(&format!(
            r#"
            SELECT {BOOK_COLUMNS} FROM books
            WHERE price_cents BETWEEN ?1 AND ?2
            ORDER BY id
            LIMIT ?3 OFFSET ?4
            "#
        ))
        .bind(min_cents)
        .bind(max_cents)
        .bind(BOOKS_PAGE_SIZE)
        .bind(Page::<Book>::offset(page_no, BOOKS_PAGE_SIZE))
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(page_no, BOOKS_PAGE_SIZE, total, records))
    }
}

// =============================================================================
// Shared statements
// =============================================================================
// Generic over the executor so the checkout transaction can run them on its
// own connection.

pub(crate) async fn fetch_book<'e, E>(executor: E, id: i64) -> DbResult<Option<Book>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let book = sqlx::query_as::<_, Book>(&format!(
        "SELECT {BOOK_COLUMNS} FROM books WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(book)
}

pub(crate) async fn sell_copies<'e, E>(executor: E, id: i64, quantity: i64) -> DbResult<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(id, quantity, "Updating stock and sales");

    let result = sqlx::query(
        r#"
        UPDATE books
        SET stock = stock - ?2,
            sales = sales + ?2
        WHERE id = ?1 AND stock >= ?2
        "#,
    )
    .bind(id)
    .bind(quantity)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    pub(crate) fn new_book(title: &str, price_cents: i64, stock: i64) -> NewBook {
        NewBook {
            title: title.to_string(),
            author: format!("{title} Author"),
            price_cents,
            stock,
            sales: 0,
            image_path: "/static/img/default.jpg".to_string(),
        }
    }

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = setup().await;
        let inserted = db.books().insert(&new_book("Dune", 1000, 5)).await.unwrap();
        assert!(inserted.id > 0);

        let fetched = db.books().get_by_id(inserted.id).await.unwrap().unwrap();
        assert_eq!(fetched, inserted);
        assert_eq!(fetched.author, "Dune Author");

        assert!(db.books().get_by_id(9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let db = setup().await;
        let book = db.books().insert(&new_book("Dune", 1000, 5)).await.unwrap();

        let mut changed = new_book("Dune Messiah", 1200, 7);
        changed.sales = 3;
        let updated = db.books().update(book.id, &changed).await.unwrap();
        assert_eq!(updated.title, "Dune Messiah");
        assert_eq!(updated.sales, 3);

        let missing = db.books().update(9999, &changed).await;
        assert!(matches!(missing, Err(DbError::NotFound { .. })));

        assert!(db.books().delete(book.id).await.unwrap());
        assert!(!db.books().delete(book.id).await.unwrap());
        assert_eq!(db.books().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_invalid_books_are_rejected() {
        let db = setup().await;

        for bad in [
            new_book("Negative", -1, 5),
            new_book("Priceless", i64::MAX / 100, 5),
            new_book("Backorder", 1000, -1),
            new_book("   ", 1000, 5),
        ] {
            let result = db.books().insert(&bad).await;
            assert!(
                matches!(result, Err(DbError::Core(CoreError::Validation(_)))),
                "{bad:?} should be rejected, got {result:?}"
            );
        }
        assert_eq!(db.books().count().await.unwrap(), 0);

        let book = db.books().insert(&new_book("Dune", 1000, 5)).await.unwrap();
        let result = db.books().update(book.id, &new_book("Dune", -500, 5)).await;
        assert!(matches!(
            result,
            Err(DbError::Core(CoreError::Validation(_)))
        ));
        let unchanged = db.books().get_by_id(book.id).await.unwrap().unwrap();
        assert_eq!(unchanged.price_cents, 1000);
    }

    #[tokio::test]
    async fn test_update_stock_and_sales_moves_in_lockstep() {
        let db = setup().await;
        let book = db.books().insert(&new_book("Dune", 1000, 5)).await.unwrap();

        assert!(db.books().update_stock_and_sales(book.id, 2).await.unwrap());
        let after = db.books().get_by_id(book.id).await.unwrap().unwrap();
        assert_eq!(after.stock, 3);
        assert_eq!(after.sales, 2);

        // Not enough left: nothing moves
        assert!(!db.books().update_stock_and_sales(book.id, 4).await.unwrap());
        let after = db.books().get_by_id(book.id).await.unwrap().unwrap();
        assert_eq!(after.stock, 3);
        assert_eq!(after.sales, 2);

        assert!(!db.books().update_stock_and_sales(9999, 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_paging() {
        let db = setup().await;
        for (i, price) in [500, 1000, 1500, 2000, 2500].iter().enumerate() {
            db.books()
                .insert(&new_book(&format!("Book {i}"), *price, 1))
                .await
                .unwrap();
        }

        let first = db.books().page(1).await.unwrap();
        assert_eq!(first.records.len(), 4);
        assert_eq!(first.total_records, 5);
        assert_eq!(first.total_pages, 2);
        assert!(first.has_next());

        let second = db.books().page(2).await.unwrap();
        assert_eq!(second.records.len(), 1);
        assert_eq!(second.records[0].title, "Book 4");
        assert!(!second.has_next());

        // Below 1 clamps
        let clamped = db.books().page(0).await.unwrap();
        assert_eq!(clamped.page_no, 1);
        assert_eq!(clamped.records[0].title, "Book 0");

        let past_end = db.books().page(9).await.unwrap();
        assert!(past_end.records.is_empty());
    }

    #[tokio::test]
    async fn test_page_by_price() {
        let db = setup().await;
        for (i, price) in [500, 1000, 1500, 2000, 2500].iter().enumerate() {
            db.books()
                .insert(&new_book(&format!("Book {i}"), *price, 1))
                .await
                .unwrap();
        }

        let page = db.books().page_by_price(1, 1000, 2000).await.unwrap();
        assert_eq!(page.total_records, 3);
        assert_eq!(page.total_pages, 1);
        let prices: Vec<i64> = page.records.iter().map(|b| b.price_cents).collect();
        assert_eq!(prices, vec![1000, 1500, 2000]);
    }
}
