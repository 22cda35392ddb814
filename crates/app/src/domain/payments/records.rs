//! Payment Records

use jiff_sqlx::{Date as SqlxDate, Timestamp as SqlxTimestamp};
use mival::{
    payments::{
        CardDetails, CreditCard, DebitCard, IdempotencyKey, InstrumentKind, PaymentInstrument,
        PaymentInstrumentUuid, PaymentReceipt, PaymentTransactionUuid,
    },
    users::UserUuid,
};
use rust_decimal::Decimal;
use sqlx::{FromRow, Row, postgres::PgRow};

fn missing_column(index: &str) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: index.to_string(),
        source: format!("{index} is required for this instrument kind").into(),
    }
}

#[derive(Debug, Clone)]
pub(crate) struct PaymentInstrumentRecord(pub(crate) PaymentInstrument);

impl<'r> FromRow<'r, PgRow> for PaymentInstrumentRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let kind = row
            .try_get::<String, _>("kind")?
            .parse::<InstrumentKind>()
            .map_err(|e| sqlx::Error::ColumnDecode {
                index: "kind".to_string(),
                source: Box::new(e),
            })?;

        let card = CardDetails {
            id: PaymentInstrumentUuid::from_uuid(row.try_get("uuid")?),
            user_id: UserUuid::from_uuid(row.try_get("user_uuid")?),
            holder_name: row.try_get("holder_name")?,
            masked_number: row.try_get("masked_number")?,
            expires_on: row.try_get::<SqlxDate, _>("expires_on")?.to_jiff(),
        };

        let instrument = match kind {
            InstrumentKind::Credit => PaymentInstrument::Credit(CreditCard {
                card,
                credit_limit: row
                    .try_get::<Option<Decimal>, _>("credit_limit")?
                    .ok_or_else(|| missing_column("credit_limit"))?,
            }),
            InstrumentKind::Debit => PaymentInstrument::Debit(DebitCard {
                card,
                account_reference: row
                    .try_get::<Option<String>, _>("account_reference")?
                    .ok_or_else(|| missing_column("account_reference"))?,
            }),
        };

        Ok(Self(instrument))
    }
}

#[derive(Debug, Clone)]
pub(crate) struct PaymentReceiptRecord(pub(crate) PaymentReceipt);

impl<'r> FromRow<'r, PgRow> for PaymentReceiptRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let idempotency_key = IdempotencyKey::new(row.try_get::<String, _>("idempotency_key")?)
            .map_err(|e| sqlx::Error::ColumnDecode {
                index: "idempotency_key".to_string(),
                source: Box::new(e),
            })?;

        Ok(Self(PaymentReceipt {
            transaction_id: PaymentTransactionUuid::from_uuid(row.try_get("uuid")?),
            instrument_id: PaymentInstrumentUuid::from_uuid(
                row.try_get("payment_instrument_uuid")?,
            ),
            amount: row.try_get("amount")?,
            processed_at: row.try_get::<SqlxTimestamp, _>("processed_at")?.to_jiff(),
            idempotency_key,
        }))
    }
}
