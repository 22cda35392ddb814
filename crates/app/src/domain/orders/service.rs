//! Orders service.

use async_trait::async_trait;
use mival::{
    orders::{Order, OrderId, PurchaseRecord},
    users::UserUuid,
};
use mockall::automock;

use crate::{
    database::Db,
    domain::orders::{
        errors::OrdersServiceError,
        repositories::{PgOrdersRepository, PgPurchaseHistoryRepository},
    },
};

#[derive(Debug, Clone)]
pub struct PgOrdersService {
    db: Db,
    orders: PgOrdersRepository,
    history: PgPurchaseHistoryRepository,
}

impl PgOrdersService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            orders: PgOrdersRepository::new(),
            history: PgPurchaseHistoryRepository::new(),
        }
    }
}

#[async_trait]
impl OrdersService for PgOrdersService {
    async fn get_order(&self, order: &OrderId) -> Result<Order, OrdersServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let order = self.orders.get_order(&mut tx, order).await?;

        tx.commit().await?;

        Ok(order)
    }

    async fn list_history(&self, user: UserUuid) -> Result<Vec<PurchaseRecord>, OrdersServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let records = self.history.list_history(&mut tx, user).await?;

        tx.commit().await?;

        Ok(records)
    }
}

#[automock]
#[async_trait]
pub trait OrdersService: Send + Sync {
    /// Retrieve an order with its frozen lines.
    async fn get_order(&self, order: &OrderId) -> Result<Order, OrdersServiceError>;

    /// A user's paid orders, newest first.
    async fn list_history(&self, user: UserUuid) -> Result<Vec<PurchaseRecord>, OrdersServiceError>;
}
