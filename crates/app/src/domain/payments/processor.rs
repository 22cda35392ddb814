//! Payment processor.
//!
//! Charges are captured in the `payment_transactions` ledger in their own
//! transaction, independent of any checkout transaction, because a capture
//! cannot be undone by a rollback. The idempotency key is the ledger's unique
//! key: a retried request finds the earlier receipt instead of capturing again.

use async_trait::async_trait;
use jiff::Timestamp;
use mival::payments::{Chargeable, PaymentReceipt, PaymentTransactionUuid};
use mockall::automock;
use tracing::{Span, info};

use crate::{
    database::Db,
    domain::payments::{
        data::ChargeRequest, errors::PaymentError, repositories::PgPaymentTransactionsRepository,
    },
};

#[derive(Debug, Clone)]
pub struct PgPaymentProcessor {
    db: Db,
    transactions: PgPaymentTransactionsRepository,
}

impl PgPaymentProcessor {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            transactions: PgPaymentTransactionsRepository::new(),
        }
    }
}

fn ensure_same_charge(
    request: &ChargeRequest,
    receipt: PaymentReceipt,
) -> Result<PaymentReceipt, PaymentError> {
    if receipt.instrument_id != request.instrument.id() || receipt.amount != request.amount {
        return Err(PaymentError::IdempotencyConflict(
            request.idempotency_key.clone(),
        ));
    }

    Ok(receipt)
}

#[async_trait]
impl PaymentProcessor for PgPaymentProcessor {
    #[tracing::instrument(
        name = "payments.processor.charge",
        skip(self, request),
        fields(
            payment_instrument_uuid = %request.instrument.id(),
            amount = %request.amount,
            idempotency_key = %request.idempotency_key,
            replayed = tracing::field::Empty
        ),
        err
    )]
    async fn charge(&self, request: ChargeRequest) -> Result<PaymentReceipt, PaymentError> {
        let span = Span::current();
        let mut tx = self.db.begin_transaction().await?;

        if let Some(existing) = self
            .transactions
            .get_transaction_by_key(&mut tx, &request.idempotency_key)
            .await?
        {
            tx.commit().await?;

            span.record("replayed", true);

            return ensure_same_charge(&request, existing);
        }

        request.instrument.authorize(request.amount)?;

        let receipt = PaymentReceipt {
            transaction_id: PaymentTransactionUuid::new(),
            instrument_id: request.instrument.id(),
            amount: request.amount,
            processed_at: Timestamp::now(),
            idempotency_key: request.idempotency_key.clone(),
        };

        let receipt = match self.transactions.create_transaction(&mut tx, &receipt).await? {
            Some(created) => created,
            None => {
                // A concurrent request with the same key won the insert.
                let existing = self
                    .transactions
                    .get_transaction_by_key(&mut tx, &request.idempotency_key)
                    .await?
                    .ok_or(sqlx::Error::RowNotFound)?;

                span.record("replayed", true);

                ensure_same_charge(&request, existing)?
            }
        };

        tx.commit().await?;

        info!(transaction_uuid = %receipt.transaction_id, "captured payment");

        Ok(receipt)
    }
}

#[automock]
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Captures the requested amount, or returns the receipt of an earlier
    /// capture made with the same idempotency key.
    async fn charge(&self, request: ChargeRequest) -> Result<PaymentReceipt, PaymentError>;
}
