//! # Cart Commands
//!
//! Every cart command needs a live session; an anonymous caller gets
//! "Please log in first".
//!
//! ## Cart Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Lifecycle                                       │
//! │                                                                         │
//! │  ┌──────────┐     ┌──────────┐     ┌──────────┐                        │
//! │  │ No cart  │────►│ In Cart  │────►│  Order   │                        │
//! │  │          │     │          │     │ (Placed) │                        │
//! │  └──────────┘     └──────────┘     └──────────┘                        │
//! │       ▲                │                 ▲                              │
//! │       │           add_to_cart        checkout                          │
//! │       │           update_cart_item   (order.rs)                        │
//! │       │           remove_cart_item                                      │
//! │       │                │                                                │
//! │       │                ▼                                                │
//! │       └─────────── clear_cart                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Line ids are only meaningful inside the caller's own cart: a line that
//! belongs to someone else is treated exactly like a missing one.

use serde::Serialize;
use tracing::debug;

use crate::auth::authenticate;
use crate::error::ApiError;
use crate::state::AppState;
use bookstore_core::validation::validate_quantity;
use bookstore_core::{CartItem, CartTotals, CartView, CoreError};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartResponse {
    pub item: CartItem,
    /// Title of the book just added, for the "added X to cart" notice
    pub book_title: String,
    pub totals: CartTotals,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartItemResponse {
    pub item: CartItem,
    pub line_amount_cents: i64,
    pub totals: CartTotals,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveCartItemResponse {
    /// `false` when there was no such line; removal is idempotent
    pub removed: bool,
    pub totals: CartTotals,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearCartResponse {
    pub cleared: bool,
}

/// Adds a book to the caller's cart, creating the cart on first use.
///
/// ## Behavior
/// - Book already in cart: quantity increases by `quantity`
/// - Book not in cart: new line at the book's current price
/// - The price is frozen on the line; later catalog edits do not touch it
///
/// ## Errors
/// * `NOT_AUTHENTICATED` - no live session
/// * `VALIDATION_ERROR` - quantity outside 1..=999, or the line would pass 999
/// * `NOT_FOUND` - no such book
pub async fn add_to_cart(
    state: &AppState,
    token: Option<&str>,
    book_id: i64,
    quantity: Option<i64>,
) -> Result<AddToCartResponse, ApiError> {
    let session = authenticate(state, token).await?;
    let quantity = quantity.unwrap_or(1);
    debug!(user_id = session.user_id, book_id, quantity, "add_to_cart command");

    validate_quantity(quantity).map_err(CoreError::from)?;

    let added = state
        .db()
        .carts()
        .add_item(session.user_id, book_id, quantity)
        .await?;

    Ok(AddToCartResponse {
        item: added.item,
        book_title: added.book.title,
        totals: caller_totals(state, session.user_id).await?,
    })
}

/// Overwrites the quantity of one of the caller's cart lines.
///
/// ## Errors
/// * `NOT_AUTHENTICATED` - no live session
/// * `VALIDATION_ERROR` - quantity outside 1..=999
/// * `NOT_FOUND` - no such line in the caller's cart
pub async fn update_cart_item(
    state: &AppState,
    token: Option<&str>,
    item_id: i64,
    quantity: i64,
) -> Result<UpdateCartItemResponse, ApiError> {
    let session = authenticate(state, token).await?;
    debug!(user_id = session.user_id, item_id, quantity, "update_cart_item command");

    validate_quantity(quantity).map_err(CoreError::from)?;

    if owned_item(state, session.user_id, item_id).await?.is_none() {
        return Err(CoreError::CartItemNotFound(item_id).into());
    }

    let item = state
        .db()
        .carts()
        .update_item_quantity(item_id, quantity)
        .await?;

    Ok(UpdateCartItemResponse {
        line_amount_cents: item.line_amount().cents(),
        item,
        totals: caller_totals(state, session.user_id).await?,
    })
}

/// Removes one of the caller's cart lines. Removing a missing line succeeds
/// with `removed: false`.
pub async fn remove_cart_item(
    state: &AppState,
    token: Option<&str>,
    item_id: i64,
) -> Result<RemoveCartItemResponse, ApiError> {
    let session = authenticate(state, token).await?;
    debug!(user_id = session.user_id, item_id, "remove_cart_item command");

    let removed = match owned_item(state, session.user_id, item_id).await? {
        Some(item) => state.db().carts().remove_item(item.id).await?,
        None => false,
    };

    Ok(RemoveCartItemResponse {
        removed,
        totals: caller_totals(state, session.user_id).await?,
    })
}

/// Deletes the caller's cart and all of its lines.
pub async fn clear_cart(
    state: &AppState,
    token: Option<&str>,
) -> Result<ClearCartResponse, ApiError> {
    let session = authenticate(state, token).await?;
    debug!(user_id = session.user_id, "clear_cart command");

    let carts = state.db().carts();
    let cleared = match carts.get_by_user(session.user_id).await? {
        Some(cart) => carts.clear(&cart.id).await?,
        None => false,
    };

    Ok(ClearCartResponse { cleared })
}

/// The cart page: lines with their books, plus totals.
///
/// A caller who has never added anything gets an empty view.
pub async fn get_cart_info(state: &AppState, token: Option<&str>) -> Result<CartView, ApiError> {
    let session = authenticate(state, token).await?;
    debug!(user_id = session.user_id, "get_cart_info command");

    Ok(state.db().carts().view(session.user_id).await?)
}

/// The line, if it exists and sits in `user_id`'s cart.
async fn owned_item(
    state: &AppState,
    user_id: i64,
    item_id: i64,
) -> Result<Option<CartItem>, ApiError> {
    let carts = state.db().carts();

    let Some(item) = carts.get_item(item_id).await? else {
        return Ok(None);
    };
    let owned = carts
        .get_by_user(user_id)
        .await?
        .is_some_and(|cart| cart.id == item.cart_id);

    Ok(owned.then_some(item))
}

async fn caller_totals(state: &AppState, user_id: i64) -> Result<CartTotals, ApiError> {
    let cart = state.db().carts().get_by_user(user_id).await?;
    Ok(cart.map(|cart| cart.totals()).unwrap_or_default())
}
