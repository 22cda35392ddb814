//! Payments

pub mod data;
pub mod errors;
pub mod processor;
mod records;
pub(crate) mod repositories;
pub mod service;

pub use errors::{PaymentError, PaymentInstrumentsServiceError};
pub use processor::*;
pub use service::*;
