//! Store Settings Repository

use sqlx::{Postgres, Transaction, query_scalar};

const GET_SETTING_SQL: &str = include_str!("sql/get_setting.sql");
const UPSERT_SETTING_SQL: &str = include_str!("sql/upsert_setting.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgStoreSettingsRepository;

impl PgStoreSettingsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn get_setting(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        key: &str,
    ) -> Result<Option<String>, sqlx::Error> {
        query_scalar::<Postgres, String>(GET_SETTING_SQL)
            .bind(key)
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn upsert_setting(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        key: &str,
        value: &str,
    ) -> Result<String, sqlx::Error> {
        query_scalar::<Postgres, String>(UPSERT_SETTING_SQL)
            .bind(key)
            .bind(value)
            .fetch_one(&mut **tx)
            .await
    }
}
