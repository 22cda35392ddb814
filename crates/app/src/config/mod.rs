//! Application configuration
//!
//! Each group is a `clap` argument struct with environment fallbacks, to be
//! flattened into a binary's parser.

mod checkout;
mod db;
mod logging;

pub use checkout::CheckoutConfig;
pub use db::DatabaseConfig;
pub use logging::{LogFormat, LoggingConfig};
