//! # Storefront Commands
//!
//! The actions a shopper or an administrator can take.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs      ◄─── You are here (exports)
//! ├── account.rs  ◄─── Register, login, logout
//! ├── catalog.rs  ◄─── Book pages, price filter
//! ├── cart.rs     ◄─── Cart manipulation
//! └── order.rs    ◄─── Checkout, ship, receive, order history
//! ```
//!
//! ## How Commands Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Command Flow                                         │
//! │                                                                         │
//! │  async fn add_to_cart(                                                  │
//! │      state: &AppState,        ◄── Database + config                    │
//! │      token: Option<&str>,     ◄── Session token, if any                │
//! │      book_id: i64,                                                      │
//! │      quantity: Option<i64>,   ◄── Defaults to 1                        │
//! │  ) -> Result<AddToCartResponse, ApiError>                               │
//! │         │                                                               │
//! │         ├── authenticate(token)     ✗ → NOT_AUTHENTICATED               │
//! │         ├── validate input          ✗ → VALIDATION_ERROR                │
//! │         ├── repository call         ✗ → NOT_FOUND / CONFLICT / ...      │
//! │         ▼                                                               │
//! │  Serializable response (camelCase JSON)                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod account;
pub mod cart;
pub mod catalog;
pub mod order;
