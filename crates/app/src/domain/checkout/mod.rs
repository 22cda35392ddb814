//! Checkout
//!
//! Converts an active cart into a paid order. Everything except the payment
//! capture happens in one database transaction; see [`PgOrderFinalizer`].

pub mod data;
pub mod errors;
pub mod finalizer;

pub use data::{CheckoutSettings, CheckoutStage, FinalizeOrder};
pub use errors::{CheckoutError, CheckoutFailure, ErrorCategory};
pub use finalizer::*;
