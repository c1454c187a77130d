//! # Order Commands
//!
//! Checkout and the order status lifecycle.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   cart ──checkout──► Placed ──ship_order──► Shipped ──receive_order──►  │
//! │  (shopper)                    (admin)                 (owner only)     │
//! │                                                         Received        │
//! │                                                                         │
//! │  Any other step: INVALID_TRANSITION. Nothing ever moves backwards.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `ship_order` and `list_all_orders` belong to the admin surface and take
//! no session.

use tracing::{debug, info};

use crate::auth::authenticate;
use crate::error::ApiError;
use crate::state::AppState;
use bookstore_core::{CoreError, Order, OrderDetail};

/// Turns the caller's cart into a placed order.
///
/// Stock and sales move for every line and the cart is deleted, all in one
/// transaction.
///
/// ## Errors
/// * `NOT_AUTHENTICATED` - no live session
/// * `VALIDATION_ERROR` - no cart, or an empty one
/// * `INSUFFICIENT_STOCK` - some line asks for more copies than are left;
///   nothing changes
/// * `NOT_FOUND` - a book in the cart has been removed from the catalog
pub async fn checkout(state: &AppState, token: Option<&str>) -> Result<OrderDetail, ApiError> {
    let session = authenticate(state, token).await?;
    debug!(user_id = session.user_id, "checkout command");

    let detail = state.db().orders().checkout(session.user_id).await?;

    info!(
        order_id = %detail.order.id,
        username = %session.username,
        "Checkout complete"
    );
    Ok(detail)
}

/// Marks a placed order as shipped.
///
/// ## Errors
/// * `NOT_FOUND` - no such order
/// * `INVALID_TRANSITION` - the order is not `placed`
pub async fn ship_order(state: &AppState, order_id: &str) -> Result<Order, ApiError> {
    debug!(order_id, "ship_order command");
    Ok(state.db().orders().ship(order_id).await?)
}

/// Confirms receipt of a shipped order. Only its owner may do this.
///
/// ## Errors
/// * `NOT_AUTHENTICATED` - no live session
/// * `NOT_FOUND` - no such order
/// * `FORBIDDEN` - the order belongs to someone else
/// * `INVALID_TRANSITION` - the order is not `shipped`
pub async fn receive_order(
    state: &AppState,
    token: Option<&str>,
    order_id: &str,
) -> Result<Order, ApiError> {
    let session = authenticate(state, token).await?;
    debug!(user_id = session.user_id, order_id, "receive_order command");

    Ok(state
        .db()
        .orders()
        .receive(order_id, session.user_id)
        .await?)
}

/// An order with its frozen line items.
pub async fn get_order_detail(state: &AppState, order_id: &str) -> Result<OrderDetail, ApiError> {
    state
        .db()
        .orders()
        .get_detail(order_id)
        .await?
        .ok_or_else(|| CoreError::OrderNotFound(order_id.to_string()).into())
}

/// The caller's orders, newest first.
pub async fn list_my_orders(state: &AppState, token: Option<&str>) -> Result<Vec<Order>, ApiError> {
    let session = authenticate(state, token).await?;
    Ok(state.db().orders().list_for_user(session.user_id).await?)
}

/// Every order in the store, newest first.
pub async fn list_all_orders(state: &AppState) -> Result<Vec<Order>, ApiError> {
    Ok(state.db().orders().list_all().await?)
}
