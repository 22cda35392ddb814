//! Library service.

use async_trait::async_trait;
use jiff::Timestamp;
use mival::{catalog::CatalogItemUuid, library::OwnedGame, users::UserUuid};
use mockall::automock;
use tracing::info;

use crate::{
    database::Db,
    domain::library::{
        data::NewLibraryGame, errors::LibraryServiceError, repository::PgLibraryRepository,
    },
};

#[derive(Debug, Clone)]
pub struct PgLibraryService {
    db: Db,
    repository: PgLibraryRepository,
}

impl PgLibraryService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgLibraryRepository::new(),
        }
    }
}

#[async_trait]
impl LibraryService for PgLibraryService {
    async fn list_games(&self, user: UserUuid) -> Result<Vec<OwnedGame>, LibraryServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let games = self.repository.list_games(&mut tx, user).await?;

        tx.commit().await?;

        Ok(games)
    }

    async fn owns_game(
        &self,
        user: UserUuid,
        item: CatalogItemUuid,
    ) -> Result<bool, LibraryServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let owned = self.repository.owns_game(&mut tx, user, item).await?;

        tx.commit().await?;

        Ok(owned)
    }

    #[tracing::instrument(
        name = "library.service.add_game",
        skip(self, game),
        fields(user_uuid = %game.user_uuid, catalog_item_uuid = %game.item_uuid),
        err
    )]
    async fn add_game(&self, game: NewLibraryGame) -> Result<(), LibraryServiceError> {
        let activation_key = game.activation_key.trim();

        if activation_key.is_empty() {
            return Err(LibraryServiceError::MissingRequiredData);
        }

        let mut tx = self.db.begin_transaction().await?;

        self.repository
            .create_entry(
                &mut tx,
                game.user_uuid,
                game.item_uuid,
                Timestamp::now(),
                activation_key,
            )
            .await?;

        tx.commit().await?;

        info!("added game to library");

        Ok(())
    }
}

#[automock]
#[async_trait]
pub trait LibraryService: Send + Sync {
    /// Games a user owns, oldest purchase first. Repurchases appear once per
    /// purchase.
    async fn list_games(&self, user: UserUuid) -> Result<Vec<OwnedGame>, LibraryServiceError>;

    /// Whether the user has at least one entry for the item.
    async fn owns_game(
        &self,
        user: UserUuid,
        item: CatalogItemUuid,
    ) -> Result<bool, LibraryServiceError>;

    /// Grants a game with an activation key.
    async fn add_game(&self, game: NewLibraryGame) -> Result<(), LibraryServiceError>;
}
