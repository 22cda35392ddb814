//! Payment instruments service.

use async_trait::async_trait;
use mival::payments::{PaymentInstrument, PaymentInstrumentUuid};
use mockall::automock;
use tracing::info;

use crate::{
    database::Db,
    domain::payments::{
        data::{NewInstrumentTerms, NewPaymentInstrument},
        errors::PaymentInstrumentsServiceError,
        repositories::PgPaymentInstrumentsRepository,
    },
};

/// Shortest card number accepted, in digits.
const MIN_CARD_DIGITS: usize = 12;

#[derive(Debug, Clone)]
pub struct PgPaymentInstrumentsService {
    db: Db,
    repository: PgPaymentInstrumentsRepository,
}

impl PgPaymentInstrumentsService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgPaymentInstrumentsRepository::new(),
        }
    }
}

fn validate(instrument: &NewPaymentInstrument) -> Result<(), PaymentInstrumentsServiceError> {
    if instrument.holder_name.trim().is_empty() {
        return Err(PaymentInstrumentsServiceError::MissingRequiredData);
    }

    let digits = instrument
        .card_number
        .chars()
        .filter(char::is_ascii_digit)
        .count();

    if digits < MIN_CARD_DIGITS {
        return Err(PaymentInstrumentsServiceError::InvalidData);
    }

    match &instrument.terms {
        NewInstrumentTerms::Credit { credit_limit }
            if credit_limit.is_sign_negative() && !credit_limit.is_zero() =>
        {
            Err(PaymentInstrumentsServiceError::InvalidData)
        }
        NewInstrumentTerms::Debit { account_reference } if account_reference.trim().is_empty() => {
            Err(PaymentInstrumentsServiceError::MissingRequiredData)
        }
        NewInstrumentTerms::Credit { .. } | NewInstrumentTerms::Debit { .. } => Ok(()),
    }
}

#[async_trait]
impl PaymentInstrumentsService for PgPaymentInstrumentsService {
    #[tracing::instrument(
        name = "payments.service.create_instrument",
        skip(self, instrument),
        fields(payment_instrument_uuid = %instrument.uuid, user_uuid = %instrument.user_uuid),
        err
    )]
    async fn create_instrument(
        &self,
        instrument: NewPaymentInstrument,
    ) -> Result<PaymentInstrument, PaymentInstrumentsServiceError> {
        validate(&instrument)?;

        let mut tx = self.db.begin_transaction().await?;

        let created = self.repository.create_instrument(&mut tx, instrument).await?;

        tx.commit().await?;

        info!(
            payment_instrument_uuid = %created.id(),
            kind = %created.kind(),
            "created payment instrument"
        );

        Ok(created)
    }

    async fn get_instrument(
        &self,
        instrument: PaymentInstrumentUuid,
    ) -> Result<PaymentInstrument, PaymentInstrumentsServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let instrument = self.repository.get_instrument(&mut tx, instrument).await?;

        tx.commit().await?;

        Ok(instrument)
    }
}

#[automock]
#[async_trait]
pub trait PaymentInstrumentsService: Send + Sync {
    /// Registers a card for a user. Only the masked number is stored.
    async fn create_instrument(
        &self,
        instrument: NewPaymentInstrument,
    ) -> Result<PaymentInstrument, PaymentInstrumentsServiceError>;

    /// Retrieve a single instrument.
    async fn get_instrument(
        &self,
        instrument: PaymentInstrumentUuid,
    ) -> Result<PaymentInstrument, PaymentInstrumentsServiceError>;
}
