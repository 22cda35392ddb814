//! Mival
//!
//! Domain model for a digital game storefront: catalog items, shopping carts,
//! discount codes, tax rates, payment instruments, orders and per-user game
//! libraries. Nothing in this crate performs I/O; persistence and the checkout
//! workflow live in `mival-app`.

pub mod carts;
pub mod catalog;
pub mod discounts;
pub mod ids;
pub mod library;
pub mod orders;
pub mod payments;
pub mod taxes;
pub mod users;

pub use ids::TypedUuid;
