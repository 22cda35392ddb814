//! Cart Items Repository

use mival::{
    carts::{CartLine, CartUuid},
    catalog::CatalogItemUuid,
};
use sqlx::{Postgres, Transaction, query, query_as};

use crate::domain::carts::records::CartLineRecord;

const GET_CART_LINES_SQL: &str = include_str!("../sql/get_cart_lines.sql");
const UPSERT_CART_LINE_SQL: &str = include_str!("../sql/upsert_cart_line.sql");
const DELETE_CART_LINE_SQL: &str = include_str!("../sql/delete_cart_line.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgCartItemsRepository;

impl PgCartItemsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    /// Lines of a cart, each carrying the current catalog row.
    pub(crate) async fn get_cart_lines(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
    ) -> Result<Vec<CartLine>, sqlx::Error> {
        let records = query_as::<Postgres, CartLineRecord>(GET_CART_LINES_SQL)
            .bind(cart.into_uuid())
            .fetch_all(&mut **tx)
            .await?;

        Ok(records.into_iter().map(|CartLineRecord(line)| line).collect())
    }

    pub(crate) async fn upsert_cart_line(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
        line: &CartLine,
    ) -> Result<(), sqlx::Error> {
        let quantity = i32::try_from(line.quantity).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

        query(UPSERT_CART_LINE_SQL)
            .bind(cart.into_uuid())
            .bind(line.item.id.into_uuid())
            .bind(quantity)
            .bind(line.subtotal())
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    pub(crate) async fn delete_cart_line(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
        item: CatalogItemUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(DELETE_CART_LINE_SQL)
            .bind(cart.into_uuid())
            .bind(item.into_uuid())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }
}
