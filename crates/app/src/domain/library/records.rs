//! Library Records

use jiff_sqlx::Timestamp as SqlxTimestamp;
use mival::library::OwnedGame;
use sqlx::{FromRow, Row, postgres::PgRow};

use crate::domain::catalog::records::CatalogItemRecord;

#[derive(Debug, Clone)]
pub(crate) struct OwnedGameRecord(pub(crate) OwnedGame);

impl<'r> FromRow<'r, PgRow> for OwnedGameRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let CatalogItemRecord(item) = CatalogItemRecord::from_row(row)?;

        Ok(Self(OwnedGame {
            item,
            purchased_at: row.try_get::<SqlxTimestamp, _>("purchased_at")?.to_jiff(),
            activation_key: row.try_get("activation_key")?,
        }))
    }
}
