//! # Catalog Commands
//!
//! Browsing books, four per page. No login required.

use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;
use bookstore_core::validation::validate_price_range;
use bookstore_core::{Book, CoreError, Page};

/// One page of the catalog. `page_no` defaults to 1; values below 1 clamp.
pub async fn list_books(state: &AppState, page_no: Option<i64>) -> Result<Page<Book>, ApiError> {
    let page_no = page_no.unwrap_or(1);
    debug!(page_no, "list_books command");

    Ok(state.db().books().page(page_no).await?)
}

/// One page of books priced within `[min_cents, max_cents]`.
///
/// ## Errors
/// * `VALIDATION_ERROR` - negative bound, or min above max
pub async fn list_books_by_price(
    state: &AppState,
    page_no: Option<i64>,
    min_cents: i64,
    max_cents: i64,
) -> Result<Page<Book>, ApiError> {
    let page_no = page_no.unwrap_or(1);
    debug!(page_no, min_cents, max_cents, "list_books_by_price command");

    validate_price_range(min_cents, max_cents).map_err(CoreError::from)?;

    Ok(state
        .db()
        .books()
        .page_by_price(page_no, min_cents, max_cents)
        .await?)
}

pub async fn get_book(state: &AppState, book_id: i64) -> Result<Book, ApiError> {
    state
        .db()
        .books()
        .get_by_id(book_id)
        .await?
        .ok_or_else(|| CoreError::BookNotFound(book_id).into())
}
