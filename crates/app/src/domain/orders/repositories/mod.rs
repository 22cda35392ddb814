//! Order Repositories

mod history;
mod orders;

pub(crate) use history::PgPurchaseHistoryRepository;
pub(crate) use orders::{NewOrderHeader, PgOrdersRepository};
