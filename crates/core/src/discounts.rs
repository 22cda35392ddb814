//! Discount codes
//!
//! A code is either a percentage of the order subtotal or a fixed amount.
//! Codes flagged as non-accumulable may be redeemed once; after that their
//! `consumed_at` is set and every further attempt fails.

use std::{fmt, str::FromStr};

use jiff::{Timestamp, civil::Date};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a discount value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountKind {
    /// `value` is a percentage in `[0, 100]` of the subtotal.
    Percentage,

    /// `value` is subtracted from the subtotal as-is.
    FixedAmount,
}

impl DiscountKind {
    /// Storage representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Percentage => "PERCENTAGE",
            Self::FixedAmount => "FIXED_AMOUNT",
        }
    }
}

impl fmt::Display for DiscountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a stored discount kind is not recognised.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown discount kind `{0}`")]
pub struct UnknownDiscountKind(pub String);

impl FromStr for DiscountKind {
    type Err = UnknownDiscountKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PERCENTAGE" => Ok(Self::Percentage),
            "FIXED_AMOUNT" => Ok(Self::FixedAmount),
            other => Err(UnknownDiscountKind(other.to_string())),
        }
    }
}

/// Reasons a discount code cannot be applied.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DiscountError {
    #[error("discount code `{0}` does not exist")]
    UnknownCode(String),

    #[error("discount code `{0}` is inactive")]
    Inactive(String),

    #[error("discount code `{code}` is not valid until {starts_on}")]
    NotYetValid { code: String, starts_on: Date },

    #[error("discount code `{code}` expired on {ends_on}")]
    Expired { code: String, ends_on: Date },

    #[error("discount code `{0}` has already been used")]
    AlreadyConsumed(String),
}

/// A redeemable discount code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountCode {
    /// Code as typed by the customer.
    pub code: String,
    /// Percentage or amount, depending on `kind`.
    pub value: Decimal,
    /// How `value` is applied.
    pub kind: DiscountKind,
    /// First day the code may be used.
    pub starts_on: Date,
    /// Last day the code may be used.
    pub ends_on: Date,
    /// Inactive codes are always rejected.
    pub is_active: bool,
    /// Accumulable codes may be redeemed any number of times.
    pub is_accumulable: bool,
    /// Set once a single-use code has been redeemed.
    pub consumed_at: Option<Timestamp>,
}

impl DiscountCode {
    /// Non-accumulable codes can only be redeemed once.
    pub fn is_single_use(&self) -> bool {
        !self.is_accumulable
    }

    /// Checks that the code may be applied on `today`.
    ///
    /// The validity window is inclusive on both ends.
    ///
    /// # Errors
    ///
    /// Returns the first failing rule, checked in the order: active flag,
    /// start date, end date, single-use consumption.
    pub fn validate(&self, today: Date) -> Result<(), DiscountError> {
        if !self.is_active {
            return Err(DiscountError::Inactive(self.code.clone()));
        }

        if today < self.starts_on {
            return Err(DiscountError::NotYetValid {
                code: self.code.clone(),
                starts_on: self.starts_on,
            });
        }

        if today > self.ends_on {
            return Err(DiscountError::Expired {
                code: self.code.clone(),
                ends_on: self.ends_on,
            });
        }

        if self.is_single_use() && self.consumed_at.is_some() {
            return Err(DiscountError::AlreadyConsumed(self.code.clone()));
        }

        Ok(())
    }

    /// Amount taken off `subtotal`.
    ///
    /// Fixed amounts are not clamped to the subtotal; an order whose discount
    /// exceeds its subtotal is rejected when the order is built.
    pub fn amount_for(&self, subtotal: Decimal) -> Decimal {
        match self.kind {
            DiscountKind::Percentage => subtotal * self.value / Decimal::ONE_HUNDRED,
            DiscountKind::FixedAmount => self.value,
        }
    }
}

/// Normalises a user supplied code; blank input means no code.
pub fn normalize_code(code: Option<&str>) -> Option<&str> {
    code.map(str::trim).filter(|code| !code.is_empty())
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;
    use testresult::TestResult;

    use super::*;

    fn code(kind: DiscountKind, value: Decimal) -> DiscountCode {
        DiscountCode {
            code: "SPRING".to_string(),
            value,
            kind,
            starts_on: date(2024, 3, 1),
            ends_on: date(2024, 3, 31),
            is_active: true,
            is_accumulable: true,
            consumed_at: None,
        }
    }

    #[test]
    fn percentage_discount_is_share_of_subtotal() {
        let code = code(DiscountKind::Percentage, Decimal::TEN);

        assert_eq!(code.amount_for(Decimal::new(2500, 2)), Decimal::new(250, 2));
    }

    #[test]
    fn fixed_discount_is_not_clamped_to_subtotal() {
        let code = code(DiscountKind::FixedAmount, Decimal::new(5000, 2));

        assert_eq!(code.amount_for(Decimal::new(2000, 2)), Decimal::new(5000, 2));
    }

    #[test]
    fn window_is_inclusive() -> TestResult {
        let code = code(DiscountKind::Percentage, Decimal::TEN);

        code.validate(date(2024, 3, 1))?;
        code.validate(date(2024, 3, 31))?;

        Ok(())
    }

    #[test]
    fn expired_and_future_codes_are_rejected() {
        let code = code(DiscountKind::Percentage, Decimal::TEN);

        assert!(matches!(
            code.validate(date(2024, 4, 1)),
            Err(DiscountError::Expired { .. })
        ));
        assert!(matches!(
            code.validate(date(2024, 2, 29)),
            Err(DiscountError::NotYetValid { .. })
        ));
    }

    #[test]
    fn inactive_code_is_rejected() {
        let code = DiscountCode {
            is_active: false,
            ..code(DiscountKind::Percentage, Decimal::TEN)
        };

        assert_eq!(
            code.validate(date(2024, 3, 10)),
            Err(DiscountError::Inactive("SPRING".to_string()))
        );
    }

    #[test]
    fn consumed_single_use_code_is_rejected() {
        let code = DiscountCode {
            is_accumulable: false,
            consumed_at: Some(Timestamp::UNIX_EPOCH),
            ..code(DiscountKind::FixedAmount, Decimal::ONE)
        };

        assert_eq!(
            code.validate(date(2024, 3, 10)),
            Err(DiscountError::AlreadyConsumed("SPRING".to_string()))
        );
    }

    #[test]
    fn blank_codes_normalise_to_none() {
        assert_eq!(normalize_code(None), None);
        assert_eq!(normalize_code(Some("   ")), None);
        assert_eq!(normalize_code(Some(" SPRING ")), Some("SPRING"));
    }
}
