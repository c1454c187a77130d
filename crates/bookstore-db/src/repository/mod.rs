//! # Repository Module
//!
//! Database repository implementations for the bookstore.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Storefront command                                                    │
//! │       │                                                                 │
//! │       │  db.orders().checkout(user_id)                                 │
//! │       ▼                                                                 │
//! │  OrderRepository                                                       │
//! │  ├── checkout(&self, user_id)        ← one transaction                 │
//! │  ├── ship(&self, order_id)                                             │
//! │  ├── receive(&self, order_id, user)                                    │
//! │  └── list_for_user(&self, user_id)                                     │
//! │       │                                                                 │
//! │       │  SQL                                                            │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`BookRepository`] - Catalog CRUD, paging, stock/sales updates
//! - [`UserRepository`] - Accounts
//! - [`SessionRepository`] - Login sessions
//! - [`CartRepository`] - Carts and cart lines
//! - [`OrderRepository`] - Checkout, status lifecycle, order queries
//!
//! [`BookRepository`]: book::BookRepository
//! [`UserRepository`]: user::UserRepository
//! [`SessionRepository`]: session::SessionRepository
//! [`CartRepository`]: cart::CartRepository
//! [`OrderRepository`]: order::OrderRepository

pub mod book;
pub mod cart;
pub mod order;
pub mod session;
pub mod user;
