//! Tax rates

use std::{fmt, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Most decimal places a rate may carry; orders store rates as `NUMERIC(6, 5)`.
pub const MAX_TAX_RATE_SCALE: u32 = 5;

/// Rate used when the store has no configured VAT rate.
pub const DEFAULT_FALLBACK_TAX_RATE: TaxRate = TaxRate::ZERO;

/// Errors raised when building a [`TaxRate`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TaxRateError {
    /// Rates are fractions in `[0, 1)`.
    #[error("tax rate {0} is outside [0, 1)")]
    OutOfRange(Decimal),

    /// Rates carry at most [`MAX_TAX_RATE_SCALE`] decimal places.
    #[error("tax rate {0} has more than {MAX_TAX_RATE_SCALE} decimal places")]
    TooPrecise(Decimal),

    /// The input could not be parsed as a decimal.
    #[error("invalid tax rate `{0}`")]
    Unparseable(String),
}

/// A fractional tax rate, e.g. `0.19` for 19%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct TaxRate(Decimal);

impl TaxRate {
    /// No tax.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Creates a rate from a fraction.
    ///
    /// # Errors
    ///
    /// Returns [`TaxRateError::OutOfRange`] unless `0 <= rate < 1`, and
    /// [`TaxRateError::TooPrecise`] when the rate would be rounded on storage.
    pub fn new(rate: Decimal) -> Result<Self, TaxRateError> {
        if rate.is_sign_negative() || rate >= Decimal::ONE {
            return Err(TaxRateError::OutOfRange(rate));
        }

        if rate.normalize().scale() > MAX_TAX_RATE_SCALE {
            return Err(TaxRateError::TooPrecise(rate));
        }

        Ok(Self(rate))
    }

    /// Creates a rate from a percentage, e.g. `19` for 19%.
    ///
    /// # Errors
    ///
    /// Returns [`TaxRateError::OutOfRange`] unless `0 <= percent < 100`.
    pub fn from_percent(percent: Decimal) -> Result<Self, TaxRateError> {
        Self::new(percent / Decimal::ONE_HUNDRED)
    }

    /// The rate as a fraction.
    pub fn value(self) -> Decimal {
        self.0
    }

    /// `1 + rate`.
    pub fn multiplier(self) -> Decimal {
        Decimal::ONE + self.0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        DEFAULT_FALLBACK_TAX_RATE
    }
}

impl TryFrom<Decimal> for TaxRate {
    type Error = TaxRateError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TaxRate> for Decimal {
    fn from(rate: TaxRate) -> Self {
        rate.0
    }
}

impl FromStr for TaxRate {
    type Err = TaxRateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rate = Decimal::from_str(s.trim())
            .map_err(|_err| TaxRateError::Unparseable(s.to_string()))?;

        Self::new(rate)
    }
}

impl fmt::Display for TaxRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
