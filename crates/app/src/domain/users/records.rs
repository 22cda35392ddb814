//! User Records

use mival::users::{User, UserUuid};
use sqlx::{FromRow, Row, postgres::PgRow};

#[derive(Debug, Clone)]
pub(crate) struct UserRecord(pub(crate) User);

impl<'r> FromRow<'r, PgRow> for UserRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self(User {
            id: UserUuid::from_uuid(row.try_get("uuid")?),
            display_name: row.try_get("display_name")?,
            email: row.try_get("email")?,
        }))
    }
}
