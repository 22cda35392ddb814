//! Discounts service.

use async_trait::async_trait;
use mival::discounts::{DiscountCode, DiscountKind, normalize_code};
use mockall::automock;
use rust_decimal::Decimal;
use tracing::info;

use crate::{
    database::Db,
    domain::discounts::{
        data::NewDiscountCode, errors::DiscountsServiceError, repository::PgDiscountsRepository,
    },
};

#[derive(Debug, Clone)]
pub struct PgDiscountsService {
    db: Db,
    repository: PgDiscountsRepository,
}

impl PgDiscountsService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgDiscountsRepository::new(),
        }
    }
}

#[async_trait]
impl DiscountsService for PgDiscountsService {
    #[tracing::instrument(
        name = "discounts.service.create_code",
        skip(self, code),
        fields(code = %code.code, kind = %code.kind),
        err
    )]
    async fn create_code(
        &self,
        code: NewDiscountCode,
    ) -> Result<DiscountCode, DiscountsServiceError> {
        let Some(trimmed) = normalize_code(Some(&code.code)) else {
            return Err(DiscountsServiceError::MissingRequiredData);
        };

        let negative = code.value.is_sign_negative() && !code.value.is_zero();
        let over_hundred =
            code.kind == DiscountKind::Percentage && code.value > Decimal::ONE_HUNDRED;

        if negative || over_hundred || code.starts_on > code.ends_on {
            return Err(DiscountsServiceError::InvalidData);
        }

        let code = NewDiscountCode {
            code: trimmed.to_string(),
            ..code
        };

        let mut tx = self.db.begin_transaction().await?;

        let created = self.repository.create_code(&mut tx, code).await?;

        tx.commit().await?;

        info!(code = %created.code, "created discount code");

        Ok(created)
    }

    async fn get_code(&self, code: &str) -> Result<DiscountCode, DiscountsServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let code = self.repository.get_code(&mut tx, code.trim()).await?;

        tx.commit().await?;

        Ok(code)
    }

    async fn count_redemptions(&self, code: &str) -> Result<i64, DiscountsServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let count = self.repository.count_redemptions(&mut tx, code.trim()).await?;

        tx.commit().await?;

        Ok(count)
    }
}

#[automock]
#[async_trait]
pub trait DiscountsService: Send + Sync {
    /// Creates a discount code. Codes are created out of band; checkout only
    /// redeems them.
    async fn create_code(&self, code: NewDiscountCode)
    -> Result<DiscountCode, DiscountsServiceError>;

    /// Retrieve a single code.
    async fn get_code(&self, code: &str) -> Result<DiscountCode, DiscountsServiceError>;

    /// Number of paid orders that redeemed `code`.
    async fn count_redemptions(&self, code: &str) -> Result<i64, DiscountsServiceError>;
}
