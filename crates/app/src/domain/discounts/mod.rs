//! Discount codes

pub mod data;
pub mod errors;
mod records;
pub(crate) mod repository;
pub mod service;

pub use errors::DiscountsServiceError;
pub use service::*;
