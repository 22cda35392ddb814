//! Catalog service.

use async_trait::async_trait;
use mockall::automock;
use mival::catalog::{CatalogItem, CatalogItemUuid};
use tracing::info;

use crate::{
    database::Db,
    domain::catalog::{
        data::{CatalogItemUpdate, NewCatalogItem},
        errors::CatalogServiceError,
        repository::PgCatalogRepository,
    },
};

#[derive(Debug, Clone)]
pub struct PgCatalogService {
    db: Db,
    repository: PgCatalogRepository,
}

impl PgCatalogService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgCatalogRepository::new(),
        }
    }
}

#[async_trait]
impl CatalogService for PgCatalogService {
    async fn list_available(&self) -> Result<Vec<CatalogItem>, CatalogServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let items = self.repository.list_available(&mut tx).await?;

        tx.commit().await?;

        Ok(items)
    }

    async fn get_item(&self, item: CatalogItemUuid) -> Result<CatalogItem, CatalogServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let item = self.repository.get_item(&mut tx, item).await?;

        tx.commit().await?;

        Ok(item)
    }

    #[tracing::instrument(
        name = "catalog.service.create_item",
        skip(self, item),
        fields(catalog_item_uuid = %item.uuid, status = %item.status),
        err
    )]
    async fn create_item(&self, item: NewCatalogItem) -> Result<CatalogItem, CatalogServiceError> {
        if item.price.is_sign_negative() && !item.price.is_zero() {
            return Err(CatalogServiceError::InvalidData);
        }

        let mut tx = self.db.begin_transaction().await?;

        let created = self.repository.create_item(&mut tx, item).await?;

        tx.commit().await?;

        info!(catalog_item_uuid = %created.id, "created catalog item");

        Ok(created)
    }

    #[tracing::instrument(
        name = "catalog.service.update_item",
        skip(self, update),
        fields(catalog_item_uuid = %item, price = %update.price, status = %update.status),
        err
    )]
    async fn update_item(
        &self,
        item: CatalogItemUuid,
        update: CatalogItemUpdate,
    ) -> Result<CatalogItem, CatalogServiceError> {
        if update.price.is_sign_negative() && !update.price.is_zero() {
            return Err(CatalogServiceError::InvalidData);
        }

        let mut tx = self.db.begin_transaction().await?;

        let updated = self.repository.update_item(&mut tx, item, update).await?;

        tx.commit().await?;

        Ok(updated)
    }
}

#[automock]
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Items whose status currently permits purchase.
    async fn list_available(&self) -> Result<Vec<CatalogItem>, CatalogServiceError>;

    /// Retrieve a single item regardless of status.
    async fn get_item(&self, item: CatalogItemUuid) -> Result<CatalogItem, CatalogServiceError>;

    /// Adds an item to the catalog.
    async fn create_item(&self, item: NewCatalogItem) -> Result<CatalogItem, CatalogServiceError>;

    /// Changes an item's price and status. Existing orders keep their frozen
    /// prices.
    async fn update_item(
        &self,
        item: CatalogItemUuid,
        update: CatalogItemUpdate,
    ) -> Result<CatalogItem, CatalogServiceError>;
}
