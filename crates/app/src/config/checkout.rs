//! Checkout Config

use std::time::Duration;

use clap::Args;
use mival::taxes::TaxRate;

use crate::domain::checkout::CheckoutSettings;

/// Checkout settings.
#[derive(Debug, Clone, Args)]
pub struct CheckoutConfig {
    /// VAT rate used when the store has none configured, as a fraction in [0, 1)
    #[arg(long, env = "FALLBACK_TAX_RATE", default_value = "0")]
    pub fallback_tax_rate: TaxRate,

    /// Hard limit on a single payment capture, in milliseconds
    #[arg(long, env = "PAYMENT_TIMEOUT_MS", default_value_t = 10_000)]
    pub payment_timeout_ms: u64,
}

impl CheckoutConfig {
    #[must_use]
    pub fn settings(&self) -> CheckoutSettings {
        CheckoutSettings {
            fallback_tax_rate: self.fallback_tax_rate,
            payment_timeout: Duration::from_millis(self.payment_timeout_ms),
        }
    }
}
