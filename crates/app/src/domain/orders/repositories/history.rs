//! Purchase History Repository

use jiff_sqlx::Date as SqlxDate;
use mival::{orders::PurchaseRecord, users::UserUuid};
use sqlx::{Postgres, Transaction, query, query_as};

use crate::domain::orders::records::PurchaseRecordRow;

const CREATE_HISTORY_SQL: &str = include_str!("../sql/create_history.sql");
const LIST_HISTORY_SQL: &str = include_str!("../sql/list_history.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgPurchaseHistoryRepository;

impl PgPurchaseHistoryRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn create_history(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        record: &PurchaseRecord,
    ) -> Result<(), sqlx::Error> {
        query(CREATE_HISTORY_SQL)
            .bind(record.order_id.as_str())
            .bind(record.user_id.into_uuid())
            .bind(SqlxDate::from(record.purchased_on))
            .bind(record.total)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    pub(crate) async fn list_history(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
    ) -> Result<Vec<PurchaseRecord>, sqlx::Error> {
        let records = query_as::<Postgres, PurchaseRecordRow>(LIST_HISTORY_SQL)
            .bind(user.into_uuid())
            .fetch_all(&mut **tx)
            .await?;

        Ok(records.into_iter().map(|PurchaseRecordRow(record)| record).collect())
    }
}
