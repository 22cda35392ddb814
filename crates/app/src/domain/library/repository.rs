//! Library Repository

use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use mival::{
    catalog::CatalogItemUuid,
    library::{LibraryEntry, OwnedGame},
    orders::OrderId,
    users::UserUuid,
};
use sqlx::{Postgres, Transaction, query, query_as, query_scalar};
use uuid::Uuid;

use crate::domain::library::records::OwnedGameRecord;

const CREATE_ENTRIES_SQL: &str = include_str!("sql/create_entries.sql");
const CREATE_ENTRY_SQL: &str = include_str!("sql/create_entry.sql");
const LIST_GAMES_SQL: &str = include_str!("sql/list_games.sql");
const OWNS_GAME_SQL: &str = include_str!("sql/owns_game.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgLibraryRepository;

impl PgLibraryRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    /// Appends the entries granted by one order in a single statement.
    pub(crate) async fn create_order_entries(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
        order: &OrderId,
        purchased_at: Timestamp,
        entries: &[LibraryEntry],
    ) -> Result<u64, sqlx::Error> {
        let uuids: Vec<Uuid> = entries.iter().map(|_| Uuid::now_v7()).collect();
        let items: Vec<Uuid> = entries.iter().map(|entry| entry.item_id.into_uuid()).collect();

        let rows_affected = query(CREATE_ENTRIES_SQL)
            .bind(user.into_uuid())
            .bind(order.as_str())
            .bind(SqlxTimestamp::from(purchased_at))
            .bind(uuids)
            .bind(items)
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    pub(crate) async fn create_entry(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
        item: CatalogItemUuid,
        purchased_at: Timestamp,
        activation_key: &str,
    ) -> Result<(), sqlx::Error> {
        query(CREATE_ENTRY_SQL)
            .bind(Uuid::now_v7())
            .bind(user.into_uuid())
            .bind(item.into_uuid())
            .bind(SqlxTimestamp::from(purchased_at))
            .bind(activation_key)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    pub(crate) async fn list_games(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
    ) -> Result<Vec<OwnedGame>, sqlx::Error> {
        let records = query_as::<Postgres, OwnedGameRecord>(LIST_GAMES_SQL)
            .bind(user.into_uuid())
            .fetch_all(&mut **tx)
            .await?;

        Ok(records.into_iter().map(|OwnedGameRecord(game)| game).collect())
    }

    pub(crate) async fn owns_game(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
        item: CatalogItemUuid,
    ) -> Result<bool, sqlx::Error> {
        query_scalar::<Postgres, bool>(OWNS_GAME_SQL)
            .bind(user.into_uuid())
            .bind(item.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }
}
