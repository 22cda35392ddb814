//! Payment Transactions Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use mival::payments::{IdempotencyKey, PaymentReceipt};
use sqlx::{Postgres, Transaction, query_as};

use crate::domain::payments::records::PaymentReceiptRecord;

const GET_TRANSACTION_BY_KEY_SQL: &str = include_str!("../sql/get_transaction_by_key.sql");
const CREATE_TRANSACTION_SQL: &str = include_str!("../sql/create_transaction.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgPaymentTransactionsRepository;

impl PgPaymentTransactionsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn get_transaction_by_key(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        key: &IdempotencyKey,
    ) -> Result<Option<PaymentReceipt>, sqlx::Error> {
        let record = query_as::<Postgres, PaymentReceiptRecord>(GET_TRANSACTION_BY_KEY_SQL)
            .bind(key.as_str())
            .fetch_optional(&mut **tx)
            .await?;

        Ok(record.map(|PaymentReceiptRecord(receipt)| receipt))
    }

    /// Inserts a receipt unless its idempotency key is already recorded, in
    /// which case `None` is returned and nothing is written.
    pub(crate) async fn create_transaction(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        receipt: &PaymentReceipt,
    ) -> Result<Option<PaymentReceipt>, sqlx::Error> {
        let record = query_as::<Postgres, PaymentReceiptRecord>(CREATE_TRANSACTION_SQL)
            .bind(receipt.transaction_id.into_uuid())
            .bind(receipt.instrument_id.into_uuid())
            .bind(receipt.amount)
            .bind(receipt.idempotency_key.as_str())
            .bind(SqlxTimestamp::from(receipt.processed_at))
            .fetch_optional(&mut **tx)
            .await?;

        Ok(record.map(|PaymentReceiptRecord(receipt)| receipt))
    }
}
