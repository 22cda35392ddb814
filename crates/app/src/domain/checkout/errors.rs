//! Checkout errors.

use std::time::Duration;

use mival::{
    carts::{CartState, CartUuid},
    catalog::CatalogItemUuid,
    discounts::DiscountError,
    orders::OrderError,
    payments::{PaymentDeclined, PaymentInstrumentUuid},
};
use serde::Serialize;
use thiserror::Error;

use crate::domain::{checkout::data::CheckoutStage, payments::PaymentError, taxes::TaxesServiceError};

/// Coarse classification of a checkout failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    /// Malformed or inconsistent input.
    Validation,

    /// An entity is not in a state that allows the operation.
    InvalidState,

    /// The discount code is unknown, inactive, out of its window or used.
    InvalidDiscount,

    /// The payment instrument refused the charge.
    PaymentDeclined,

    /// Storage or processor failure. Retrying with the same idempotency key
    /// is safe.
    Persistence,

    /// A referenced entity does not exist.
    NotFound,
}

/// Why a checkout failed.
#[derive(Debug, Error)]
pub enum CheckoutFailure {
    #[error("cart {0} not found")]
    CartNotFound(CartUuid),

    #[error("cart is {0}, not ACTIVE")]
    CartNotActive(CartState),

    #[error("cart has no items")]
    CartEmpty,

    #[error("catalog item {0} can no longer be purchased")]
    ItemUnavailable(CatalogItemUuid),

    #[error("payment instrument {0} not found")]
    InstrumentNotFound(PaymentInstrumentUuid),

    #[error("payment instrument {0} belongs to another user")]
    InstrumentNotOwned(PaymentInstrumentUuid),

    #[error("idempotency key was already used for cart {0}")]
    IdempotencyKeyReused(CartUuid),

    #[error(transparent)]
    InvalidDiscount(#[from] DiscountError),

    #[error(transparent)]
    InvalidOrder(#[from] OrderError),

    #[error(transparent)]
    PaymentDeclined(#[from] PaymentDeclined),

    #[error("payment did not complete within {0:?}")]
    PaymentTimedOut(Duration),

    #[error("payment processor failed")]
    PaymentFailed(#[source] PaymentError),

    #[error("tax rate lookup failed")]
    Tax(#[from] TaxesServiceError),

    #[error("storage error")]
    Persistence(#[from] sqlx::Error),
}

impl CheckoutFailure {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::CartNotFound(_) | Self::InstrumentNotFound(_) => ErrorCategory::NotFound,
            Self::CartEmpty
            | Self::InstrumentNotOwned(_)
            | Self::IdempotencyKeyReused(_)
            | Self::PaymentFailed(PaymentError::IdempotencyConflict(_))
            | Self::InvalidOrder(
                OrderError::EmptyOrder
                | OrderError::InvalidQuantity(_)
                | OrderError::NegativeDiscount(_)
                | OrderError::NegativeTotal { .. }
                | OrderError::LineNotFound(_),
            ) => ErrorCategory::Validation,
            Self::CartNotActive(_)
            | Self::ItemUnavailable(_)
            | Self::InvalidOrder(OrderError::InvalidTransition { .. } | OrderError::NotPending(_)) => {
                ErrorCategory::InvalidState
            }
            Self::InvalidDiscount(_) => ErrorCategory::InvalidDiscount,
            Self::PaymentDeclined(_) | Self::PaymentFailed(PaymentError::Declined(_)) => {
                ErrorCategory::PaymentDeclined
            }
            Self::PaymentTimedOut(_)
            | Self::PaymentFailed(PaymentError::Sql(_))
            | Self::Tax(_)
            | Self::Persistence(_) => ErrorCategory::Persistence,
        }
    }

    /// Persistence failures and payment timeouts may succeed on retry with
    /// the same idempotency key; nothing else will.
    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Persistence
    }
}

/// A failed checkout and the last stage it reached. Nothing from the attempt
/// was committed.
#[derive(Debug, Error)]
#[error("checkout failed after {stage}: {reason}")]
pub struct CheckoutError {
    pub stage: CheckoutStage,

    #[source]
    pub reason: CheckoutFailure,
}

impl CheckoutError {
    pub fn new(stage: CheckoutStage, reason: impl Into<CheckoutFailure>) -> Self {
        Self {
            stage,
            reason: reason.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        self.reason.category()
    }

    pub fn is_retryable(&self) -> bool {
        self.reason.is_retryable()
    }
}
