//! Orders Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use mival::{
    carts::CartUuid,
    orders::{Order, OrderId, OrderLine, OrderStatus},
    payments::IdempotencyKey,
};
use sqlx::{Postgres, Transaction, query, query_as};
use uuid::Uuid;

use crate::domain::orders::records::{OrderLineRecord, OrderRecord};

const CREATE_ORDER_SQL: &str = include_str!("../sql/create_order.sql");
const CREATE_ORDER_ITEMS_SQL: &str = include_str!("../sql/create_order_items.sql");
const GET_ORDER_SQL: &str = include_str!("../sql/get_order.sql");
const GET_ORDER_BY_IDEMPOTENCY_KEY_SQL: &str =
    include_str!("../sql/get_order_by_idempotency_key.sql");
const GET_ORDER_ITEMS_SQL: &str = include_str!("../sql/get_order_items.sql");
const TRANSITION_ORDER_SQL: &str = include_str!("../sql/transition_order.sql");

/// Columns stored on the order header that the domain order does not carry.
#[derive(Debug, Clone, Copy)]
pub(crate) struct NewOrderHeader<'a> {
    pub(crate) order: &'a Order,
    pub(crate) cart: CartUuid,
    pub(crate) idempotency_key: &'a IdempotencyKey,
}

fn encode_error(error: impl std::error::Error + Send + Sync + 'static) -> sqlx::Error {
    sqlx::Error::Encode(Box::new(error))
}

#[derive(Debug, Clone, Default)]
pub(crate) struct PgOrdersRepository;

impl PgOrdersRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    /// Writes the header, then every line in a single batch statement.
    pub(crate) async fn create_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        header: NewOrderHeader<'_>,
    ) -> Result<(), sqlx::Error> {
        let order = header.order;

        query(CREATE_ORDER_SQL)
            .bind(order.id().as_str())
            .bind(order.user_id().into_uuid())
            .bind(header.cart.into_uuid())
            .bind(order.payment_instrument_id().into_uuid())
            .bind(header.idempotency_key.as_str())
            .bind(order.discount_code())
            .bind(order.discount())
            .bind(order.tax_rate().value())
            .bind(order.status().as_str())
            .bind(SqlxTimestamp::from(order.created_at()))
            .execute(&mut **tx)
            .await?;

        self.create_order_items(tx, order.id(), order.lines()).await
    }

    async fn create_order_items(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: &OrderId,
        lines: &[OrderLine],
    ) -> Result<(), sqlx::Error> {
        let mut items: Vec<Uuid> = Vec::with_capacity(lines.len());
        let mut titles = Vec::with_capacity(lines.len());
        let mut prices = Vec::with_capacity(lines.len());
        let mut quantities = Vec::with_capacity(lines.len());
        let mut positions = Vec::with_capacity(lines.len());

        for (position, line) in lines.iter().enumerate() {
            items.push(line.item_id.into_uuid());
            titles.push(line.title.clone());
            prices.push(line.unit_price);
            quantities.push(i32::try_from(line.quantity).map_err(encode_error)?);
            positions.push(i32::try_from(position).map_err(encode_error)?);
        }

        query(CREATE_ORDER_ITEMS_SQL)
            .bind(order.as_str())
            .bind(items)
            .bind(titles)
            .bind(prices)
            .bind(quantities)
            .bind(positions)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    pub(crate) async fn get_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: &OrderId,
    ) -> Result<Order, sqlx::Error> {
        let record = query_as::<Postgres, OrderRecord>(GET_ORDER_SQL)
            .bind(order.as_str())
            .fetch_one(&mut **tx)
            .await?;

        let lines = self.get_order_items(tx, order).await?;

        record.into_order(lines)
    }

    /// The order header stored under an idempotency key, if any.
    pub(crate) async fn find_by_idempotency_key(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        key: &IdempotencyKey,
    ) -> Result<Option<OrderRecord>, sqlx::Error> {
        query_as::<Postgres, OrderRecord>(GET_ORDER_BY_IDEMPOTENCY_KEY_SQL)
            .bind(key.as_str())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn get_order_items(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: &OrderId,
    ) -> Result<Vec<OrderLine>, sqlx::Error> {
        let records = query_as::<Postgres, OrderLineRecord>(GET_ORDER_ITEMS_SQL)
            .bind(order.as_str())
            .fetch_all(&mut **tx)
            .await?;

        Ok(records.into_iter().map(|OrderLineRecord(line)| line).collect())
    }

    /// Compare-and-set on the order status.
    pub(crate) async fn transition_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: &OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(TRANSITION_ORDER_SQL)
            .bind(order.as_str())
            .bind(from.as_str())
            .bind(to.as_str())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }
}
