//! Checkout Data

use std::{fmt, time::Duration};

use mival::{
    carts::CartUuid,
    payments::{IdempotencyKey, PaymentInstrumentUuid},
    taxes::{DEFAULT_FALLBACK_TAX_RATE, TaxRate},
};
use serde::Serialize;

/// Default hard limit on a single payment capture.
pub const DEFAULT_PAYMENT_TIMEOUT: Duration = Duration::from_secs(10);

/// A request to finalize a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizeOrder {
    pub cart: CartUuid,
    pub payment_instrument: PaymentInstrumentUuid,

    /// Blank codes are treated as no code.
    pub discount_code: Option<String>,

    /// Retrying with the same key never captures twice and returns the order
    /// committed by the first successful attempt.
    pub idempotency_key: IdempotencyKey,
}

/// Tunables for the finalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutSettings {
    pub fallback_tax_rate: TaxRate,
    pub payment_timeout: Duration,
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        Self {
            fallback_tax_rate: DEFAULT_FALLBACK_TAX_RATE,
            payment_timeout: DEFAULT_PAYMENT_TIMEOUT,
        }
    }
}

/// Progress markers of a checkout, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckoutStage {
    Started,
    ItemsConverted,
    DiscountApplied,
    OrderPersisted,
    PaymentCharged,
    LibraryUpdated,
    Committed,
}

impl CheckoutStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Started => "STARTED",
            Self::ItemsConverted => "ITEMS_CONVERTED",
            Self::DiscountApplied => "DISCOUNT_APPLIED",
            Self::OrderPersisted => "ORDER_PERSISTED",
            Self::PaymentCharged => "PAYMENT_CHARGED",
            Self::LibraryUpdated => "LIBRARY_UPDATED",
            Self::Committed => "COMMITTED",
        }
    }
}

impl fmt::Display for CheckoutStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
