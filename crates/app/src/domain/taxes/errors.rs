//! Taxes service errors.

use mival::taxes::TaxRateError;
use sqlx::Error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaxesServiceError {
    #[error("stored tax rate is invalid")]
    InvalidStoredRate(#[source] TaxRateError),

    #[error("storage error")]
    Sql(#[from] Error),
}
