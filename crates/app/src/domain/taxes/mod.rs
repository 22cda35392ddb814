//! Taxes

mod calculator;
pub mod errors;
mod repository;
pub mod service;

pub(crate) use calculator::PgTaxCalculator;
pub use errors::TaxesServiceError;
pub use service::*;

/// `store_settings` key holding the VAT rate as a fraction.
pub const VAT_RATE_SETTING: &str = "VAT_RATE";
