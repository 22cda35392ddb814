//! Mival Domain Concerns

pub mod carts;
pub mod catalog;
pub mod checkout;
pub mod discounts;
pub mod library;
pub mod orders;
pub mod payments;
pub mod taxes;
pub mod users;
