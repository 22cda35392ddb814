//! Payment Data

use jiff::civil::Date;
use mival::{
    payments::{IdempotencyKey, PaymentInstrument, PaymentInstrumentUuid},
    users::UserUuid,
};
use rust_decimal::Decimal;

/// Variant-specific part of a new instrument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewInstrumentTerms {
    Credit { credit_limit: Decimal },
    Debit { account_reference: String },
}

/// New Payment Instrument Data
///
/// `card_number` is masked before it reaches storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPaymentInstrument {
    pub uuid: PaymentInstrumentUuid,
    pub user_uuid: UserUuid,
    pub holder_name: String,
    pub card_number: String,
    pub expires_on: Date,
    pub terms: NewInstrumentTerms,
}

/// A request to capture `amount` from `instrument`.
///
/// Requests sharing an idempotency key capture at most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeRequest {
    pub instrument: PaymentInstrument,
    pub amount: Decimal,
    pub idempotency_key: IdempotencyKey,
}
