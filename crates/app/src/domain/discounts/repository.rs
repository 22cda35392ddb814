//! Discounts Repository

use jiff::Timestamp;
use jiff_sqlx::{Date as SqlxDate, Timestamp as SqlxTimestamp};
use mival::{discounts::DiscountCode, orders::OrderId};
use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction, query, query_as, query_scalar};

use crate::domain::discounts::{data::NewDiscountCode, records::DiscountCodeRecord};

const CREATE_CODE_SQL: &str = include_str!("sql/create_code.sql");
const GET_CODE_SQL: &str = include_str!("sql/get_code.sql");
const LOCK_CODE_SQL: &str = include_str!("sql/lock_code.sql");
const CONSUME_CODE_SQL: &str = include_str!("sql/consume_code.sql");
const CREATE_REDEMPTION_SQL: &str = include_str!("sql/create_redemption.sql");
const COUNT_REDEMPTIONS_SQL: &str = include_str!("sql/count_redemptions.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgDiscountsRepository;

impl PgDiscountsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn create_code(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        code: NewDiscountCode,
    ) -> Result<DiscountCode, sqlx::Error> {
        let DiscountCodeRecord(code) = query_as::<Postgres, DiscountCodeRecord>(CREATE_CODE_SQL)
            .bind(code.code)
            .bind(code.value)
            .bind(code.kind.as_str())
            .bind(SqlxDate::from(code.starts_on))
            .bind(SqlxDate::from(code.ends_on))
            .bind(code.is_active)
            .bind(code.is_accumulable)
            .fetch_one(&mut **tx)
            .await?;

        Ok(code)
    }

    pub(crate) async fn get_code(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        code: &str,
    ) -> Result<DiscountCode, sqlx::Error> {
        let DiscountCodeRecord(code) = query_as::<Postgres, DiscountCodeRecord>(GET_CODE_SQL)
            .bind(code)
            .fetch_one(&mut **tx)
            .await?;

        Ok(code)
    }

    /// Loads a code and row-locks it, serialising concurrent redemptions.
    pub(crate) async fn lock_code(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        code: &str,
    ) -> Result<Option<DiscountCode>, sqlx::Error> {
        let record = query_as::<Postgres, DiscountCodeRecord>(LOCK_CODE_SQL)
            .bind(code)
            .fetch_optional(&mut **tx)
            .await?;

        Ok(record.map(|DiscountCodeRecord(code)| code))
    }

    /// Marks a single-use code consumed. Returns zero when it already was.
    pub(crate) async fn consume_code(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        code: &str,
        consumed_at: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(CONSUME_CODE_SQL)
            .bind(code)
            .bind(SqlxTimestamp::from(consumed_at))
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    pub(crate) async fn create_redemption(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: &OrderId,
        code: &str,
        amount: Decimal,
        redeemed_at: Timestamp,
    ) -> Result<(), sqlx::Error> {
        query(CREATE_REDEMPTION_SQL)
            .bind(order.as_str())
            .bind(code)
            .bind(amount)
            .bind(SqlxTimestamp::from(redeemed_at))
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    pub(crate) async fn count_redemptions(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        code: &str,
    ) -> Result<i64, sqlx::Error> {
        query_scalar::<Postgres, i64>(COUNT_REDEMPTIONS_SQL)
            .bind(code)
            .fetch_one(&mut **tx)
            .await
    }
}
