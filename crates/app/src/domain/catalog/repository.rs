//! Catalog Repository

use mival::catalog::{CatalogItem, CatalogItemUuid};
use sqlx::{Postgres, Transaction, query_as};

use crate::domain::catalog::{
    data::{CatalogItemUpdate, NewCatalogItem},
    records::CatalogItemRecord,
};

const LIST_AVAILABLE_SQL: &str = include_str!("sql/list_available.sql");
const GET_ITEM_SQL: &str = include_str!("sql/get_item.sql");
const CREATE_ITEM_SQL: &str = include_str!("sql/create_item.sql");
const UPDATE_ITEM_SQL: &str = include_str!("sql/update_item.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgCatalogRepository;

impl PgCatalogRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn list_available(
        &self,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Vec<CatalogItem>, sqlx::Error> {
        let records = query_as::<Postgres, CatalogItemRecord>(LIST_AVAILABLE_SQL)
            .fetch_all(&mut **tx)
            .await?;

        Ok(records.into_iter().map(|CatalogItemRecord(item)| item).collect())
    }

    pub(crate) async fn get_item(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        item: CatalogItemUuid,
    ) -> Result<CatalogItem, sqlx::Error> {
        let CatalogItemRecord(item) = query_as::<Postgres, CatalogItemRecord>(GET_ITEM_SQL)
            .bind(item.into_uuid())
            .fetch_one(&mut **tx)
            .await?;

        Ok(item)
    }

    pub(crate) async fn create_item(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        item: NewCatalogItem,
    ) -> Result<CatalogItem, sqlx::Error> {
        let CatalogItemRecord(item) = query_as::<Postgres, CatalogItemRecord>(CREATE_ITEM_SQL)
            .bind(item.uuid.into_uuid())
            .bind(item.title)
            .bind(item.studio)
            .bind(item.genre_id)
            .bind(item.platform_id)
            .bind(item.description)
            .bind(item.price)
            .bind(item.status.as_str())
            .fetch_one(&mut **tx)
            .await?;

        Ok(item)
    }

    pub(crate) async fn update_item(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        item: CatalogItemUuid,
        update: CatalogItemUpdate,
    ) -> Result<CatalogItem, sqlx::Error> {
        let CatalogItemRecord(item) = query_as::<Postgres, CatalogItemRecord>(UPDATE_ITEM_SQL)
            .bind(item.into_uuid())
            .bind(update.price)
            .bind(update.status.as_str())
            .fetch_one(&mut **tx)
            .await?;

        Ok(item)
    }
}
