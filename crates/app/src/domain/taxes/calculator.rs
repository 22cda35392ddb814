//! Tax rate resolution.

use mival::taxes::TaxRate;
use sqlx::{Postgres, Transaction};
use tracing::debug;

use crate::domain::taxes::{
    VAT_RATE_SETTING, errors::TaxesServiceError, repository::PgStoreSettingsRepository,
};

/// Resolves the VAT rate inside a caller's transaction.
///
/// A missing setting resolves to the configured fallback. A storage failure or
/// an unparseable stored value is an error; neither falls back silently.
#[derive(Debug, Clone)]
pub(crate) struct PgTaxCalculator {
    settings: PgStoreSettingsRepository,
    fallback: TaxRate,
}

impl PgTaxCalculator {
    #[must_use]
    pub(crate) fn new(fallback: TaxRate) -> Self {
        Self {
            settings: PgStoreSettingsRepository::new(),
            fallback,
        }
    }

    pub(crate) fn fallback(&self) -> TaxRate {
        self.fallback
    }

    pub(crate) async fn configured_rate(
        &self,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Option<TaxRate>, TaxesServiceError> {
        self.settings
            .get_setting(tx, VAT_RATE_SETTING)
            .await?
            .map(|value| value.parse::<TaxRate>())
            .transpose()
            .map_err(TaxesServiceError::InvalidStoredRate)
    }

    pub(crate) async fn rate(
        &self,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<TaxRate, TaxesServiceError> {
        match self.configured_rate(tx).await? {
            Some(rate) => Ok(rate),
            None => {
                debug!(fallback = %self.fallback, "no VAT rate configured, using fallback");

                Ok(self.fallback)
            }
        }
    }

    pub(crate) async fn set_rate(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        rate: TaxRate,
    ) -> Result<TaxRate, TaxesServiceError> {
        self.settings
            .upsert_setting(tx, VAT_RATE_SETTING, &rate.to_string())
            .await?
            .parse::<TaxRate>()
            .map_err(TaxesServiceError::InvalidStoredRate)
    }
}
