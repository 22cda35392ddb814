//! Payment Repositories

mod instruments;
mod transactions;

pub(crate) use instruments::PgPaymentInstrumentsRepository;
pub(crate) use transactions::PgPaymentTransactionsRepository;
