//! Carts service.
//!
//! Every mutation locks the cart row first, rebuilds the domain [`Cart`] with
//! live catalog prices, applies the change through it, then writes the
//! affected line back.

use async_trait::async_trait;
use mival::{
    carts::{Cart, CartLine, CartState, CartUuid},
    catalog::CatalogItemUuid,
};
use mockall::automock;
use sqlx::{Postgres, Transaction};
use tracing::{Span, info};

use crate::{
    database::Db,
    domain::{
        carts::{
            data::NewCart,
            errors::CartsServiceError,
            repositories::{PgCartItemsRepository, PgCartsRepository},
        },
        catalog::repository::PgCatalogRepository,
    },
};

#[derive(Debug, Clone)]
pub struct PgCartsService {
    db: Db,
    carts_repository: PgCartsRepository,
    items_repository: PgCartItemsRepository,
    catalog_repository: PgCatalogRepository,
}

impl PgCartsService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            carts_repository: PgCartsRepository::new(),
            items_repository: PgCartItemsRepository::new(),
            catalog_repository: PgCatalogRepository::new(),
        }
    }

    async fn lock_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
    ) -> Result<Cart, CartsServiceError> {
        let record = self.carts_repository.lock_cart(tx, cart).await?;
        let lines = self.items_repository.get_cart_lines(tx, cart).await?;

        Ok(record.into_cart(lines))
    }

    async fn transition(
        &self,
        cart: CartUuid,
        next: CartState,
    ) -> Result<Cart, CartsServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let mut locked = self.lock_cart(&mut tx, cart).await?;
        let previous = locked.state();

        locked.transition_to(next)?;

        self.carts_repository
            .transition_cart(&mut tx, cart, previous, next)
            .await?;

        tx.commit().await?;

        info!(cart_uuid = %cart, from = %previous, to = %next, "cart state changed");

        Ok(locked)
    }
}

#[async_trait]
impl CartsService for PgCartsService {
    #[tracing::instrument(
        name = "carts.service.create_cart",
        skip(self, cart),
        fields(cart_uuid = %cart.uuid, user_uuid = %cart.user_uuid),
        err
    )]
    async fn create_cart(&self, cart: NewCart) -> Result<Cart, CartsServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let created = self
            .carts_repository
            .create_cart(&mut tx, cart.uuid, cart.user_uuid)
            .await?;

        tx.commit().await?;

        Ok(created.into_cart(Vec::new()))
    }

    async fn get_cart(&self, cart: CartUuid) -> Result<Cart, CartsServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let record = self.carts_repository.get_cart(&mut tx, cart).await?;
        let lines = self.items_repository.get_cart_lines(&mut tx, cart).await?;

        tx.commit().await?;

        Ok(record.into_cart(lines))
    }

    #[tracing::instrument(
        name = "carts.service.add_item",
        skip(self),
        fields(cart_uuid = %cart, catalog_item_uuid = %item, line_quantity = tracing::field::Empty),
        err
    )]
    async fn add_item(
        &self,
        cart: CartUuid,
        item: CatalogItemUuid,
        quantity: u32,
    ) -> Result<CartLine, CartsServiceError> {
        i32::try_from(quantity)?;

        let mut tx = self.db.begin_transaction().await?;

        let mut locked = self.lock_cart(&mut tx, cart).await?;

        let catalog_item = self
            .catalog_repository
            .get_item(&mut tx, item)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => CartsServiceError::CatalogItemNotFound(item),
                other => other.into(),
            })?;

        let line = locked.add_item(catalog_item, quantity)?.clone();

        i32::try_from(line.quantity)?;

        Span::current().record("line_quantity", line.quantity);

        self.items_repository
            .upsert_cart_line(&mut tx, cart, &line)
            .await?;

        tx.commit().await?;

        Ok(line)
    }

    #[tracing::instrument(
        name = "carts.service.update_quantity",
        skip(self),
        fields(cart_uuid = %cart, catalog_item_uuid = %item),
        err
    )]
    async fn update_quantity(
        &self,
        cart: CartUuid,
        item: CatalogItemUuid,
        quantity: u32,
    ) -> Result<CartLine, CartsServiceError> {
        i32::try_from(quantity)?;

        let mut tx = self.db.begin_transaction().await?;

        let mut locked = self.lock_cart(&mut tx, cart).await?;

        let line = locked.update_quantity(item, quantity)?.clone();

        self.items_repository
            .upsert_cart_line(&mut tx, cart, &line)
            .await?;

        tx.commit().await?;

        Ok(line)
    }

    #[tracing::instrument(
        name = "carts.service.remove_item",
        skip(self),
        fields(cart_uuid = %cart, catalog_item_uuid = %item),
        err
    )]
    async fn remove_item(
        &self,
        cart: CartUuid,
        item: CatalogItemUuid,
    ) -> Result<(), CartsServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let mut locked = self.lock_cart(&mut tx, cart).await?;

        locked.remove_item(item)?;

        self.items_repository
            .delete_cart_line(&mut tx, cart, item)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    #[tracing::instrument(
        name = "carts.service.abandon_cart",
        skip(self),
        fields(cart_uuid = %cart),
        err
    )]
    async fn abandon_cart(&self, cart: CartUuid) -> Result<Cart, CartsServiceError> {
        self.transition(cart, CartState::Abandoned).await
    }

    #[tracing::instrument(
        name = "carts.service.reopen_cart",
        skip(self),
        fields(cart_uuid = %cart),
        err
    )]
    async fn reopen_cart(&self, cart: CartUuid) -> Result<Cart, CartsServiceError> {
        self.transition(cart, CartState::Active).await
    }
}

#[automock]
#[async_trait]
pub trait CartsService: Send + Sync {
    /// Creates an empty, active cart for a user.
    async fn create_cart(&self, cart: NewCart) -> Result<Cart, CartsServiceError>;

    /// Retrieve a cart with line subtotals at current catalog prices.
    async fn get_cart(&self, cart: CartUuid) -> Result<Cart, CartsServiceError>;

    /// Adds units of a catalog item, merging with an existing line.
    async fn add_item(
        &self,
        cart: CartUuid,
        item: CatalogItemUuid,
        quantity: u32,
    ) -> Result<CartLine, CartsServiceError>;

    /// Replaces a line's quantity.
    async fn update_quantity(
        &self,
        cart: CartUuid,
        item: CatalogItemUuid,
        quantity: u32,
    ) -> Result<CartLine, CartsServiceError>;

    /// Removes a line. Missing lines are an error.
    async fn remove_item(
        &self,
        cart: CartUuid,
        item: CatalogItemUuid,
    ) -> Result<(), CartsServiceError>;

    /// Moves an active cart to `ABANDONED`.
    async fn abandon_cart(&self, cart: CartUuid) -> Result<Cart, CartsServiceError>;

    /// Moves an abandoned cart back to `ACTIVE`.
    async fn reopen_cart(&self, cart: CartUuid) -> Result<Cart, CartsServiceError>;
}
