//! Payment Instruments Repository

use jiff_sqlx::Date as SqlxDate;
use mival::payments::{PaymentInstrument, PaymentInstrumentUuid, mask_card_number};
use sqlx::{Postgres, Transaction, query_as};

use crate::domain::payments::{
    data::{NewInstrumentTerms, NewPaymentInstrument},
    records::PaymentInstrumentRecord,
};

const CREATE_INSTRUMENT_SQL: &str = include_str!("../sql/create_instrument.sql");
const GET_INSTRUMENT_SQL: &str = include_str!("../sql/get_instrument.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgPaymentInstrumentsRepository;

impl PgPaymentInstrumentsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn create_instrument(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        instrument: NewPaymentInstrument,
    ) -> Result<PaymentInstrument, sqlx::Error> {
        let (kind, credit_limit, account_reference) = match instrument.terms {
            NewInstrumentTerms::Credit { credit_limit } => ("CREDIT", Some(credit_limit), None),
            NewInstrumentTerms::Debit { account_reference } => {
                ("DEBIT", None, Some(account_reference))
            }
        };

        let PaymentInstrumentRecord(instrument) =
            query_as::<Postgres, PaymentInstrumentRecord>(CREATE_INSTRUMENT_SQL)
                .bind(instrument.uuid.into_uuid())
                .bind(instrument.user_uuid.into_uuid())
                .bind(kind)
                .bind(instrument.holder_name)
                .bind(mask_card_number(&instrument.card_number))
                .bind(SqlxDate::from(instrument.expires_on))
                .bind(credit_limit)
                .bind(account_reference)
                .fetch_one(&mut **tx)
                .await?;

        Ok(instrument)
    }

    pub(crate) async fn get_instrument(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        instrument: PaymentInstrumentUuid,
    ) -> Result<PaymentInstrument, sqlx::Error> {
        let PaymentInstrumentRecord(instrument) =
            query_as::<Postgres, PaymentInstrumentRecord>(GET_INSTRUMENT_SQL)
                .bind(instrument.into_uuid())
                .fetch_one(&mut **tx)
                .await?;

        Ok(instrument)
    }
}
