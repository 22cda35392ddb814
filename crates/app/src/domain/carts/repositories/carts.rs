//! Carts Repository

use mival::{
    carts::{CartState, CartUuid},
    users::UserUuid,
};
use sqlx::{Postgres, Transaction, query, query_as};

use crate::domain::carts::records::CartRecord;

const CREATE_CART_SQL: &str = include_str!("../sql/create_cart.sql");
const GET_CART_SQL: &str = include_str!("../sql/get_cart.sql");
const LOCK_CART_SQL: &str = include_str!("../sql/lock_cart.sql");
const TRANSITION_CART_SQL: &str = include_str!("../sql/transition_cart.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgCartsRepository;

impl PgCartsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn create_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
        user: UserUuid,
    ) -> Result<CartRecord, sqlx::Error> {
        query_as::<Postgres, CartRecord>(CREATE_CART_SQL)
            .bind(cart.into_uuid())
            .bind(user.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn get_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
    ) -> Result<CartRecord, sqlx::Error> {
        query_as::<Postgres, CartRecord>(GET_CART_SQL)
            .bind(cart.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    /// Loads the cart header and holds a row lock on it until the transaction
    /// ends.
    pub(crate) async fn lock_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
    ) -> Result<CartRecord, sqlx::Error> {
        query_as::<Postgres, CartRecord>(LOCK_CART_SQL)
            .bind(cart.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    /// Compare-and-set on the cart state. Returns the number of rows changed,
    /// zero when the cart was not in `from`.
    pub(crate) async fn transition_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
        from: CartState,
        to: CartState,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(TRANSITION_CART_SQL)
            .bind(cart.into_uuid())
            .bind(from.as_str())
            .bind(to.as_str())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }
}
