//! Catalog Records

use mival::catalog::{CatalogItem, CatalogItemStatus, CatalogItemUuid};
use sqlx::{FromRow, Row, postgres::PgRow};

/// A catalog row. Queries joining the catalog select its columns under their
/// own names so this decoder can be reused.
#[derive(Debug, Clone)]
pub(crate) struct CatalogItemRecord(pub(crate) CatalogItem);

impl<'r> FromRow<'r, PgRow> for CatalogItemRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let status = row
            .try_get::<String, _>("status")?
            .parse::<CatalogItemStatus>()
            .map_err(|e| sqlx::Error::ColumnDecode {
                index: "status".to_string(),
                source: Box::new(e),
            })?;

        Ok(Self(CatalogItem {
            id: CatalogItemUuid::from_uuid(row.try_get("uuid")?),
            title: row.try_get("title")?,
            studio: row.try_get("studio")?,
            genre_id: row.try_get("genre_id")?,
            platform_id: row.try_get("platform_id")?,
            description: row.try_get("description")?,
            price: row.try_get("price")?,
            status,
        }))
    }
}
