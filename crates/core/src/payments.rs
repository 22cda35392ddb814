//! Payment instruments
//!
//! Credit and debit cards share their identifying details and differ only in
//! how they authorise a charge. [`Chargeable`] is the seam between the two;
//! [`PaymentInstrument`] is what gets stored and passed around.

use std::{fmt, str::FromStr};

use jiff::{Timestamp, civil::Date};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{ids::TypedUuid, users::UserUuid};

/// Payment instrument UUID
pub type PaymentInstrumentUuid = TypedUuid<PaymentInstrument>;

/// Payment transaction UUID
pub type PaymentTransactionUuid = TypedUuid<PaymentReceipt>;

/// Maximum length of an idempotency key.
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 128;

/// Why an instrument refused a charge.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PaymentDeclined {
    #[error("amount {amount} exceeds credit limit {limit}")]
    CreditLimitExceeded { limit: Decimal, amount: Decimal },

    #[error("amount {0} is not a chargeable amount")]
    InvalidAmount(Decimal),
}

/// Fields shared by every card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDetails {
    /// Instrument identifier.
    pub id: PaymentInstrumentUuid,
    /// Owner.
    pub user_id: UserUuid,
    /// Name printed on the card.
    pub holder_name: String,
    /// Card number with only its first and last four digits visible.
    pub masked_number: String,
    /// Last day the card is valid.
    pub expires_on: Date,
}

/// A credit card with a spending limit per charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditCard {
    /// Shared card fields.
    pub card: CardDetails,
    /// Largest single charge the card accepts.
    pub credit_limit: Decimal,
}

/// A debit card drawing on a linked account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebitCard {
    /// Shared card fields.
    pub card: CardDetails,
    /// Linked bank account.
    pub account_reference: String,
}

/// Something that can be charged.
pub trait Chargeable {
    /// Identifying details of the instrument.
    fn details(&self) -> &CardDetails;

    /// Decides whether `amount` may be charged.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentDeclined`] when the instrument refuses the charge.
    fn authorize(&self, amount: Decimal) -> Result<(), PaymentDeclined>;
}

fn ensure_chargeable_amount(amount: Decimal) -> Result<(), PaymentDeclined> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(PaymentDeclined::InvalidAmount(amount));
    }

    Ok(())
}

impl Chargeable for CreditCard {
    fn details(&self) -> &CardDetails {
        &self.card
    }

    fn authorize(&self, amount: Decimal) -> Result<(), PaymentDeclined> {
        ensure_chargeable_amount(amount)?;

        if amount > self.credit_limit {
            return Err(PaymentDeclined::CreditLimitExceeded {
                limit: self.credit_limit,
                amount,
            });
        }

        Ok(())
    }
}

impl Chargeable for DebitCard {
    fn details(&self) -> &CardDetails {
        &self.card
    }

    // No balance is tracked for the linked account.
    fn authorize(&self, amount: Decimal) -> Result<(), PaymentDeclined> {
        ensure_chargeable_amount(amount)
    }
}

/// Instrument kind discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstrumentKind {
    /// Credit card.
    Credit,
    /// Debit card.
    Debit,
}

impl InstrumentKind {
    /// Storage representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Credit => "CREDIT",
            Self::Debit => "DEBIT",
        }
    }
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a stored instrument kind is not recognised.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown payment instrument kind `{0}`")]
pub struct UnknownInstrumentKind(pub String);

impl FromStr for InstrumentKind {
    type Err = UnknownInstrumentKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREDIT" => Ok(Self::Credit),
            "DEBIT" => Ok(Self::Debit),
            other => Err(UnknownInstrumentKind(other.to_string())),
        }
    }
}

/// A stored payment instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentInstrument {
    /// Charged against a credit limit.
    Credit(CreditCard),
    /// Charged against a linked account.
    Debit(DebitCard),
}

impl PaymentInstrument {
    /// Instrument identifier.
    pub fn id(&self) -> PaymentInstrumentUuid {
        self.details().id
    }

    /// Owner of the instrument.
    pub fn user_id(&self) -> UserUuid {
        self.details().user_id
    }

    /// Storage discriminator.
    pub fn kind(&self) -> InstrumentKind {
        match self {
            Self::Credit(_) => InstrumentKind::Credit,
            Self::Debit(_) => InstrumentKind::Debit,
        }
    }

    /// Whether `user` may pay with this instrument.
    pub fn is_owned_by(&self, user: UserUuid) -> bool {
        self.user_id() == user
    }
}

impl Chargeable for PaymentInstrument {
    fn details(&self) -> &CardDetails {
        match self {
            Self::Credit(card) => card.details(),
            Self::Debit(card) => card.details(),
        }
    }

    fn authorize(&self, amount: Decimal) -> Result<(), PaymentDeclined> {
        match self {
            Self::Credit(card) => card.authorize(amount),
            Self::Debit(card) => card.authorize(amount),
        }
    }
}

/// Masks a card number down to its first and last four digits.
///
/// Separators are ignored. Numbers with eight or fewer digits are fully masked.
pub fn mask_card_number(number: &str) -> String {
    let digits: Vec<char> = number.chars().filter(char::is_ascii_digit).collect();

    if digits.len() <= 8 {
        return "*".repeat(digits.len());
    }

    let first: String = digits.iter().take(4).collect();
    let last: String = digits.iter().skip(digits.len() - 4).collect();

    format!("{first}****{last}")
}

/// Errors raised when building an [`IdempotencyKey`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidIdempotencyKey {
    #[error("idempotency key must not be blank")]
    Blank,

    #[error("idempotency key is longer than {MAX_IDEMPOTENCY_KEY_LEN} characters")]
    TooLong,
}

/// Client supplied token that makes a checkout attempt safe to retry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Validates and wraps `key`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidIdempotencyKey`] when the key is blank or too long.
    pub fn new(key: impl Into<String>) -> Result<Self, InvalidIdempotencyKey> {
        let key = key.into();

        if key.trim().is_empty() {
            return Err(InvalidIdempotencyKey::Blank);
        }

        if key.chars().count() > MAX_IDEMPOTENCY_KEY_LEN {
            return Err(InvalidIdempotencyKey::TooLong);
        }

        Ok(Self(key))
    }

    /// A fresh random key.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The key as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for IdempotencyKey {
    type Error = InvalidIdempotencyKey;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<IdempotencyKey> for String {
    fn from(key: IdempotencyKey) -> Self {
        key.0
    }
}

impl FromStr for IdempotencyKey {
    type Err = InvalidIdempotencyKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Proof of a successful charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    /// Ledger row identifier.
    pub transaction_id: PaymentTransactionUuid,
    /// Charged instrument.
    pub instrument_id: PaymentInstrumentUuid,
    /// Captured amount.
    pub amount: Decimal,
    /// Capture time.
    pub processed_at: Timestamp,
    /// Key the capture was made under.
    pub idempotency_key: IdempotencyKey,
}
