//! Cart Records

use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use mival::{
    carts::{Cart, CartLine, CartState, CartUuid},
    users::UserUuid,
};
use sqlx::{FromRow, Row, postgres::PgRow};

use crate::domain::catalog::records::CatalogItemRecord;

/// Cart header row, without its lines.
#[derive(Debug, Clone)]
pub(crate) struct CartRecord {
    pub(crate) uuid: CartUuid,
    pub(crate) user_uuid: UserUuid,
    pub(crate) state: CartState,
    pub(crate) created_at: Timestamp,
}

impl CartRecord {
    pub(crate) fn into_cart(self, lines: Vec<CartLine>) -> Cart {
        Cart::restore(self.uuid, self.user_uuid, self.created_at, self.state, lines)
    }
}

impl<'r> FromRow<'r, PgRow> for CartRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let state = row
            .try_get::<String, _>("state")?
            .parse::<CartState>()
            .map_err(|e| sqlx::Error::ColumnDecode {
                index: "state".to_string(),
                source: Box::new(e),
            })?;

        Ok(Self {
            uuid: CartUuid::from_uuid(row.try_get("uuid")?),
            user_uuid: UserUuid::from_uuid(row.try_get("user_uuid")?),
            state,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
        })
    }
}

/// A cart line joined with the live catalog row it points at.
#[derive(Debug, Clone)]
pub(crate) struct CartLineRecord(pub(crate) CartLine);

impl<'r> FromRow<'r, PgRow> for CartLineRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let CatalogItemRecord(item) = CatalogItemRecord::from_row(row)?;

        let quantity = u32::try_from(row.try_get::<i32, _>("quantity")?).map_err(|e| {
            sqlx::Error::ColumnDecode {
                index: "quantity".to_string(),
                source: Box::new(e),
            }
        })?;

        Ok(Self(CartLine { item, quantity }))
    }
}
