//! HTTP handlers, one module per resource.
//!
//! Each module exposes a `*_routes()` constructor that already carries the
//! auth layers its endpoints need; [`crate::api_routes`] merges them.

pub mod auth;
pub mod catalog;
pub mod categories;
pub mod common;
pub mod health;
pub mod inventory;
pub mod products;
pub mod stock_movements;
pub mod suppliers;
pub mod users;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;
