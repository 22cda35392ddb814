//! Discount Records

use jiff_sqlx::{Date as SqlxDate, Timestamp as SqlxTimestamp};
use mival::discounts::{DiscountCode, DiscountKind};
use sqlx::{FromRow, Row, postgres::PgRow};

#[derive(Debug, Clone)]
pub(crate) struct DiscountCodeRecord(pub(crate) DiscountCode);

impl<'r> FromRow<'r, PgRow> for DiscountCodeRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let kind = row
            .try_get::<String, _>("kind")?
            .parse::<DiscountKind>()
            .map_err(|e| sqlx::Error::ColumnDecode {
                index: "kind".to_string(),
                source: Box::new(e),
            })?;

        Ok(Self(DiscountCode {
            code: row.try_get("code")?,
            value: row.try_get("value")?,
            kind,
            starts_on: row.try_get::<SqlxDate, _>("starts_on")?.to_jiff(),
            ends_on: row.try_get::<SqlxDate, _>("ends_on")?.to_jiff(),
            is_active: row.try_get("is_active")?,
            is_accumulable: row.try_get("is_accumulable")?,
            consumed_at: row
                .try_get::<Option<SqlxTimestamp>, _>("consumed_at")?
                .map(SqlxTimestamp::to_jiff),
        }))
    }
}
