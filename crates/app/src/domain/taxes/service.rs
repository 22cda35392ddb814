//! Taxes service.

use async_trait::async_trait;
use mival::taxes::TaxRate;
use mockall::automock;
use tracing::info;

use crate::{
    database::Db,
    domain::taxes::{calculator::PgTaxCalculator, errors::TaxesServiceError},
};

#[derive(Debug, Clone)]
pub struct PgTaxService {
    db: Db,
    calculator: PgTaxCalculator,
}

impl PgTaxService {
    #[must_use]
    pub fn new(db: Db, fallback: TaxRate) -> Self {
        Self {
            db,
            calculator: PgTaxCalculator::new(fallback),
        }
    }
}

#[async_trait]
impl TaxService for PgTaxService {
    async fn current_rate(&self) -> Result<TaxRate, TaxesServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let rate = self.calculator.rate(&mut tx).await?;

        tx.commit().await?;

        Ok(rate)
    }

    async fn configured_rate(&self) -> Result<Option<TaxRate>, TaxesServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let rate = self.calculator.configured_rate(&mut tx).await?;

        tx.commit().await?;

        Ok(rate)
    }

    fn fallback_rate(&self) -> TaxRate {
        self.calculator.fallback()
    }

    #[tracing::instrument(name = "taxes.service.set_rate", skip(self), fields(rate = %rate), err)]
    async fn set_rate(&self, rate: TaxRate) -> Result<TaxRate, TaxesServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let stored = self.calculator.set_rate(&mut tx, rate).await?;

        tx.commit().await?;

        info!(rate = %stored, "updated VAT rate");

        Ok(stored)
    }
}

#[automock]
#[async_trait]
pub trait TaxService: Send + Sync {
    /// The configured VAT rate, or the fallback when none is configured.
    async fn current_rate(&self) -> Result<TaxRate, TaxesServiceError>;

    /// The configured VAT rate, if any.
    async fn configured_rate(&self) -> Result<Option<TaxRate>, TaxesServiceError>;

    /// Rate used when nothing is configured.
    fn fallback_rate(&self) -> TaxRate;

    /// Stores a new VAT rate.
    async fn set_rate(&self, rate: TaxRate) -> Result<TaxRate, TaxesServiceError>;
}
